//! HTTP front end for the credit-gated query service.
//!
//! Each answered query costs one credit. Users who run out are mailed a
//! recharge instruction, and the [`recharge`] supervisor running next to the
//! server restores their balance when they reply.

pub mod caller;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gate;
pub mod notice;
pub mod routes;
pub mod state;

pub use caller::CallerEmail;
pub use classifier::{Classifier, ClassifierError, GeminiClassifier, GeminiConfig};
pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use gate::{Answer, CreditGate, EXHAUSTED_MESSAGE};
pub use notice::{MailNotifier, NoticeSender};
pub use state::AppState;
