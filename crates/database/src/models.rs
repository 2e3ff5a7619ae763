//! Database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's credit balance, keyed by their login email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserCredit {
    /// Normalized email address (primary key).
    pub email: String,
    /// Remaining query credits, never negative.
    pub credits: i64,
}

/// A mentor or investor in the data set queries are classified against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Mentor {
    /// Auto-incrementing ID.
    pub id: i64,
    /// Display name returned as the classification answer.
    pub name: String,
    /// Category or area of expertise.
    pub expertise: String,
    /// Free-form description.
    pub bio: String,
}

/// Result of a conditional credit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The balance was 0 and has been reset.
    Granted { credits: i64 },
    /// The balance was already non-zero; nothing changed.
    AlreadyFunded { credits: i64 },
    /// No user row exists for the address.
    UnknownUser,
}

/// Result of a conditional single-credit debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// One credit was taken. `recharges` is the user's grant count at the
    /// time, for [`refund_credit`](crate::credit::refund_credit).
    Debited { remaining: i64, recharges: i64 },
    /// The balance is 0; nothing changed.
    Exhausted,
    /// No user row exists for the address.
    UnknownUser,
}

/// Result of returning a debited credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundOutcome {
    /// The credit was added back.
    Refunded { credits: i64 },
    /// A recharge was granted after the debit; nothing changed.
    Superseded { credits: i64 },
}
