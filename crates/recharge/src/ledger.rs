//! The credit store as seen by the recharge path.

use async_trait::async_trait;
use database::{credit, Database, GrantOutcome};

use crate::RechargeError;

/// Conditional balance reset keyed by sender address.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Reset the balance to the replenishment quantity if it is exactly 0.
    async fn grant_if_exhausted(&self, email: &str) -> Result<GrantOutcome, RechargeError>;
}

/// [`CreditLedger`] backed by the shared SQLite store.
#[derive(Debug, Clone)]
pub struct SqlLedger {
    db: Database,
    quantity: i64,
}

impl SqlLedger {
    pub fn new(db: Database, quantity: i64) -> Self {
        Self { db, quantity }
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }
}

#[async_trait]
impl CreditLedger for SqlLedger {
    async fn grant_if_exhausted(&self, email: &str) -> Result<GrantOutcome, RechargeError> {
        Ok(credit::grant_if_exhausted(self.db.pool(), email, self.quantity).await?)
    }
}
