//! Recognizing recharge replies.

use mail_bridge::{ParsedMessage, SearchQuery};

/// Subject line that requests a recharge.
pub const DEFAULT_TRIGGER_SUBJECT: &str = "recharge 5 credits";

/// The fixed subject a recharge reply must carry.
///
/// Matching is exact and case-sensitive with no trimming, so replies whose
/// client added a `Re:` prefix do not count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeTrigger {
    subject: String,
}

impl Default for RechargeTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_TRIGGER_SUBJECT)
    }
}

impl RechargeTrigger {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The sender to credit, if `message` is a recharge request.
    pub fn matches<'m>(&self, message: &'m ParsedMessage) -> Option<&'m str> {
        (message.subject == self.subject).then_some(message.sender.as_str())
    }

    /// Server-side prefilter for the reconciliation scan.
    ///
    /// IMAP `SUBJECT` is a case-insensitive substring search, so hits are
    /// still checked with [`matches`](Self::matches).
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery::unseen_with_subject(self.subject.clone())
    }
}
