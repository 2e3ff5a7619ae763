use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};
use tracing::{info, instrument};

use crate::config::TlsMode;
use crate::{Email, MailConfig, MailError};

/// Client for sending plain-text notices over SMTP.
///
/// Uses connection pooling so bursts of notices share a connection.
pub struct MailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl MailSender {
    /// Create a new sender with the given configuration.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let creds = Credentials::new(config.username.clone(), config.password().to_string());

        let builder = match config.smtp_tls {
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host),
            TlsMode::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            }
        }
        .map_err(|e| MailError::Transport(e.to_string()))?;

        let transport = builder
            .port(config.smtp_port)
            .credentials(creds)
            .build();

        info!(
            host = %config.smtp_host,
            port = config.smtp_port,
            tls = ?config.smtp_tls,
            username = %config.username,
            "Created SMTP client"
        );

        Ok(Self {
            transport,
            from_address: config.username.clone(),
        })
    }

    /// Address notices are sent from.
    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Send an email.
    #[instrument(skip(self, email), fields(to = ?email.to, subject = %email.subject))]
    pub async fn send(&self, email: &Email) -> Result<(), MailError> {
        let message = build_message(&self.from_address, email)?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;

        info!(to = ?email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Build a lettre Message from our Email type.
fn build_message(from_address: &str, email: &Email) -> Result<Message, MailError> {
    let from = from_address
        .parse()
        .map_err(|e| MailError::InvalidAddress(format!("From: {}", e)))?;

    let mut builder = Message::builder().from(from).subject(&email.subject);

    for to in &email.to {
        let addr = to
            .parse()
            .map_err(|e| MailError::InvalidAddress(format!("To '{}': {}", to, e)))?;
        builder = builder.to(addr);
    }

    builder
        .body(email.body.clone())
        .map_err(|e| MailError::BuildEmail(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_headers() {
        let email = Email::new("a@x.com", "recharge 5 credits", "Reply to recharge.");
        let message = build_message("bot@x.com", &email).unwrap();

        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("From: bot@x.com"));
        assert!(rendered.contains("To: a@x.com"));
        assert!(rendered.contains("Subject: recharge 5 credits"));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let email = Email::new("not an address", "hi", "body");
        assert!(matches!(
            build_message("bot@x.com", &email),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_build_message_rejects_no_recipient() {
        let email = Email {
            to: Vec::new(),
            subject: "hi".to_string(),
            body: "body".to_string(),
        };
        assert!(matches!(
            build_message("bot@x.com", &email),
            Err(MailError::BuildEmail(_))
        ));
    }
}
