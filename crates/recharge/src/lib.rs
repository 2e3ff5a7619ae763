//! Mailbox-driven credit replenishment.
//!
//! Users whose balance reaches zero are asked to reply with a fixed subject
//! line. This crate watches the mailbox for those replies and resets the
//! sender's balance:
//!
//! - after every mailbox open a reconciliation scan routes unseen requests
//!   that are already waiting,
//! - a pump then waits on IDLE and routes each new arrival in order,
//! - every message goes through the same parse, match and grant path,
//! - the supervisor reconnects with backoff when the session is lost.
//!
//! # Example
//!
//! ```no_run
//! use database::Database;
//! use mail_bridge::{ImapConnector, MailConfig};
//! use recharge::{RechargeConfig, RechargeSupervisor, SqlLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:credit_gate.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let config = RechargeConfig::from_env()?;
//!     let ledger = SqlLedger::new(db, config.replenish_credits);
//!     let connector = ImapConnector::new(MailConfig::from_env()?);
//!
//!     let handle = RechargeSupervisor::new(connector, ledger, config).spawn();
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deadline;
pub mod error;
pub mod ledger;
pub mod pump;
pub mod reconnect;
pub mod router;
pub mod scanner;
pub mod state;
pub mod supervisor;
pub mod trigger;

pub use config::RechargeConfig;
pub use deadline::DeadlineTransport;
pub use error::RechargeError;
pub use ledger::{CreditLedger, SqlLedger};
pub use pump::Pump;
pub use reconnect::ReconnectConfig;
pub use router::{Disposition, MessageRouter};
pub use scanner::{reconcile, ScanReport};
pub use state::{MailboxPhase, RechargeStatus, SessionState, StatusBoard};
pub use supervisor::{RechargeHandle, RechargeSupervisor};
pub use trigger::{RechargeTrigger, DEFAULT_TRIGGER_SUBJECT};
