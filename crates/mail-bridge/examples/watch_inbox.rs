//! Example: print recharge-looking mail as it arrives.
//!
//! Required environment variables:
//! - MAIL_USERNAME
//! - MAIL_PASSWORD
//!
//! Run with:
//! ```bash
//! cargo run -p mail-bridge --example watch_inbox
//! ```

use std::time::Duration;

use mail_bridge::{FetchRange, ImapClient, MailConfig, MailError, MailEvent, MailTransport};

#[tokio::main]
async fn main() -> Result<(), MailError> {
    tracing_subscriber::fmt()
        .with_env_filter("mail_bridge=debug,watch_inbox=debug")
        .init();

    let _ = dotenvy::dotenv();
    let config = MailConfig::from_env()?;
    println!("Username: {}", config.username);

    let mut client = ImapClient::connect(&config).await?;
    let mut known = client.open_mailbox("INBOX", true).await?.exists;
    println!("INBOX has {} messages, waiting for more (Ctrl+C to stop)", known);

    loop {
        for event in client.wait_for_mail(Duration::from_secs(60)).await? {
            match event {
                MailEvent::Exists(n) if n > known => {
                    let range = FetchRange::Span {
                        start: known + 1,
                        end: n,
                    };
                    for raw in client.fetch_headers(&range).await? {
                        match mail_bridge::parse(raw) {
                            Ok(msg) => println!("#{:<5} {:<30} {}", msg.seq, msg.sender, msg.subject),
                            Err(e) => println!("skipped: {}", e),
                        }
                    }
                    known = n;
                }
                MailEvent::Exists(n) => known = n,
                MailEvent::Expunge(_) => known = known.saturating_sub(1),
            }
        }
    }
}
