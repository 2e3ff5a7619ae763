use std::time::Duration;

use thiserror::Error;

/// Errors raised by the mail transport, the parser and the SMTP sender.
#[derive(Debug, Error)]
pub enum MailError {
    /// Mail store unreachable or the session dropped
    #[error("IMAP connection error: {0}")]
    Connection(String),

    /// TLS handshake or upgrade failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credentials rejected
    #[error("IMAP authentication failed: {0}")]
    Auth(String),

    /// A mail store operation did not complete in time
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Open, search, fetch or store rejected by the server
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// Malformed or truncated message
    #[error("failed to parse message {seq}: {reason}")]
    Parse { seq: u32, reason: String },

    /// Failed to build SMTP transport
    #[error("SMTP transport error: {0}")]
    Transport(String),

    /// Failed to send email
    #[error("Failed to send email: {0}")]
    Send(String),

    /// Failed to build email message
    #[error("Failed to build email: {0}")]
    BuildEmail(String),

    /// Invalid email address
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing required environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MailError {
    /// Map an IMAP protocol error, separating a lost session from a rejected command.
    pub(crate) fn from_imap(context: &str, err: async_imap::error::Error) -> Self {
        match err {
            async_imap::error::Error::Io(e) => {
                MailError::Connection(format!("{}: {}", context, e))
            }
            async_imap::error::Error::ConnectionLost => {
                MailError::Connection(format!("{}: connection lost", context))
            }
            other => MailError::Mailbox(format!("{}: {}", context, other)),
        }
    }

    /// Whether the session is unusable after this error and must be re-established.
    pub fn is_connection_loss(&self) -> bool {
        matches!(
            self,
            MailError::Connection(_)
                | MailError::Tls(_)
                | MailError::Auth(_)
                | MailError::Timeout { .. }
                | MailError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_loss_classification() {
        assert!(MailError::Connection("reset".into()).is_connection_loss());
        assert!(MailError::Timeout {
            operation: "fetch",
            elapsed: Duration::from_secs(60)
        }
        .is_connection_loss());
        assert!(!MailError::Mailbox("NO [TRYCREATE]".into()).is_connection_loss());
        assert!(!MailError::Parse {
            seq: 4,
            reason: "truncated".into()
        }
        .is_connection_loss());
    }

    #[test]
    fn test_imap_error_mapping() {
        let lost = MailError::from_imap("FETCH", async_imap::error::Error::ConnectionLost);
        assert!(matches!(lost, MailError::Connection(_)));

        let rejected = MailError::from_imap(
            "SEARCH",
            async_imap::error::Error::No("mailbox busy".to_string()),
        );
        assert!(matches!(rejected, MailError::Mailbox(_)));
    }
}
