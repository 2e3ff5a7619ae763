//! # mail-bridge
//!
//! IMAP and SMTP plumbing for the recharge mailbox.
//!
//! The IMAP side is a single persistent session behind the [`MailTransport`]
//! trait: open a mailbox, search, fetch sender and subject headers, flag
//! messages seen and wait on IDLE for new mail. The SMTP side sends the
//! plain-text notices that tell users how to recharge.
//!
//! ## Watching a mailbox
//!
//! ```no_run
//! use std::time::Duration;
//! use mail_bridge::{FetchRange, ImapClient, MailConfig, MailEvent, MailTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mail_bridge::MailError> {
//!     let config = MailConfig::from_env()?;
//!     let mut client = ImapClient::connect(&config).await?;
//!     let status = client.open_mailbox("INBOX", false).await?;
//!
//!     for event in client.wait_for_mail(Duration::from_secs(60)).await? {
//!         if let MailEvent::Exists(n) = event {
//!             let range = FetchRange::Span { start: status.exists + 1, end: n };
//!             for raw in client.fetch_headers(&range).await? {
//!                 let msg = mail_bridge::parse(raw)?;
//!                 println!("{} -> {}", msg.sender, msg.subject);
//!             }
//!         }
//!     }
//!
//!     client.logout().await
//! }
//! ```
//!
//! ## Sending a notice
//!
//! ```no_run
//! use mail_bridge::{Email, MailConfig, MailSender};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mail_bridge::MailError> {
//!     let sender = MailSender::new(&MailConfig::from_env()?)?;
//!     sender
//!         .send(&Email::new("user@example.com", "Credits exhausted", "Reply to recharge."))
//!         .await
//! }
//! ```

mod client;
mod config;
mod error;
mod imap_client;
mod parser;
mod transport;
mod types;

pub use client::MailSender;
pub use config::{MailConfig, TlsMode};
pub use error::MailError;
pub use imap_client::{ImapClient, ImapConnector};
pub use parser::parse;
pub use transport::{MailConnector, MailTransport, HEADER_FIELDS};
pub use types::{
    Email, FetchRange, MailEvent, MailboxStatus, ParsedMessage, RawMessage, SearchQuery,
};
