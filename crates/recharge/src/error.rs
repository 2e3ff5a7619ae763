use database::DatabaseError;
use mail_bridge::MailError;
use thiserror::Error;

/// Errors raised by the recharge subsystem.
#[derive(Debug, Error)]
pub enum RechargeError {
    /// Mail store connection or protocol failure.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    /// The credit store rejected a grant.
    #[error("ledger error: {0}")]
    Ledger(#[from] DatabaseError),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The supervisor gave up reconnecting.
    #[error("gave up reconnecting after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl RechargeError {
    /// Whether the mail session must be re-established.
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, RechargeError::Mail(e) if e.is_connection_loss())
    }
}
