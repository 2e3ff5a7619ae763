//! The query path: debit, classify, refund on failure.

use std::sync::Arc;

use database::validation::{validate_email, validate_query};
use database::{credit, mentor, user, Database, DebitOutcome, RefundOutcome, UserCredit};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::classifier::{build_prompt, Classifier};
use crate::error::{ApiError, Result};
use crate::notice::NoticeSender;

/// Reply given instead of an answer once the balance is spent.
pub const EXHAUSTED_MESSAGE: &str =
    "Your credits are exhausted. Please check your email to recharge.";

/// Balance given to newly registered users.
pub const INITIAL_CREDITS: i64 = 5;

/// Result of one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub credits_remaining: i64,
    pub exhausted: bool,
}

/// Spends one credit per answered query.
pub struct CreditGate {
    db: Database,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn NoticeSender>,
}

impl CreditGate {
    pub fn new(db: Database, classifier: Arc<dyn Classifier>, notifier: Arc<dyn NoticeSender>) -> Self {
        Self {
            db,
            classifier,
            notifier,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Register `email` with the starting balance unless it already exists.
    pub async fn register(&self, email: &str) -> Result<UserCredit> {
        validate_email(email)?;
        Ok(user::ensure_user(self.db.pool(), email, INITIAL_CREDITS).await?)
    }

    /// Current balance of `email`.
    pub async fn balance(&self, email: &str) -> Result<i64> {
        credit::current_credits(self.db.pool(), email)
            .await?
            .ok_or_else(|| ApiError::UnknownUser(email.to_string()))
    }

    /// Answer `query` for `email`.
    ///
    /// The credit is taken before the model is called, so a concurrent
    /// recharge can never observe a half-spent balance. A failed call gives
    /// the credit back unless a recharge has refilled the balance meanwhile.
    pub async fn answer(&self, email: &str, query: &str) -> Result<Answer> {
        validate_query(query)?;

        let (remaining, recharges) = match credit::debit_credit(self.db.pool(), email).await? {
            DebitOutcome::Debited {
                remaining,
                recharges,
            } => (remaining, recharges),
            DebitOutcome::Exhausted => {
                info!(email = %email, "Credits exhausted, sending recharge notice");
                self.notify_exhausted(email);
                return Ok(Answer {
                    answer: EXHAUSTED_MESSAGE.to_string(),
                    credits_remaining: 0,
                    exhausted: true,
                });
            }
            DebitOutcome::UnknownUser => return Err(ApiError::UnknownUser(email.to_string())),
        };

        match self.classify(query).await {
            Ok(answer) => {
                info!(email = %email, remaining, "Query answered");
                Ok(Answer {
                    answer,
                    credits_remaining: remaining,
                    exhausted: false,
                })
            }
            Err(e) => {
                match credit::refund_credit(self.db.pool(), email, recharges).await {
                    Ok(RefundOutcome::Refunded { credits }) => {
                        warn!(email = %email, credits, "Query failed, credit refunded")
                    }
                    Ok(RefundOutcome::Superseded { credits }) => {
                        warn!(email = %email, credits, "Query failed, balance already recharged")
                    }
                    Err(refund) => error!(email = %email, "Query failed and refund failed: {}", refund),
                }
                Err(e)
            }
        }
    }

    async fn classify(&self, query: &str) -> Result<String> {
        let mentors = mentor::list_mentors(self.db.pool()).await?;
        let prompt = build_prompt(query.trim(), &mentors);
        Ok(self.classifier.classify(&prompt).await?)
    }

    /// Send the recharge notice without holding up the response.
    fn notify_exhausted(&self, email: &str) {
        let notifier = Arc::clone(&self.notifier);
        let email = email.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.send_recharge_notice(&email).await {
                error!(email = %email, "Failed to send recharge notice: {}", e);
            }
        });
    }
}
