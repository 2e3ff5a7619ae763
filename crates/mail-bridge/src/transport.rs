//! The mail store seam.
//!
//! [`MailTransport`] is one live, authenticated session. It is used by a
//! single task at a time, so every method takes `&mut self`. [`MailConnector`]
//! opens new sessions; the recharge supervisor holds one and calls it again
//! after a connection loss.

use std::time::Duration;

use async_trait::async_trait;

use crate::{FetchRange, MailError, MailEvent, MailboxStatus, RawMessage, SearchQuery};

/// Fetch item used for every message: sender and subject only, without
/// setting `\Seen`.
pub const HEADER_FIELDS: &str = "BODY.PEEK[HEADER.FIELDS (FROM SUBJECT)]";

/// A live session with the mail store.
#[async_trait]
pub trait MailTransport: Send {
    /// Open a mailbox. `read_only` opens it with EXAMINE, which rejects flag writes.
    async fn open_mailbox(&mut self, name: &str, read_only: bool) -> Result<MailboxStatus, MailError>;

    /// Sequence numbers matching `query`, ascending.
    async fn search(&mut self, query: &SearchQuery) -> Result<Vec<u32>, MailError>;

    /// Fetch the [`HEADER_FIELDS`] section for `range`, ascending by sequence number.
    async fn fetch_headers(&mut self, range: &FetchRange) -> Result<Vec<RawMessage>, MailError>;

    /// Add `\Seen` to the given messages.
    async fn mark_seen(&mut self, ids: &[u32]) -> Result<(), MailError>;

    /// Block until the server reports mailbox changes or `timeout` elapses.
    ///
    /// An empty vector means the timeout elapsed with nothing new.
    async fn wait_for_mail(&mut self, timeout: Duration) -> Result<Vec<MailEvent>, MailError>;

    /// End the session.
    async fn logout(&mut self) -> Result<(), MailError>;
}

/// Opens [`MailTransport`] sessions.
#[async_trait]
pub trait MailConnector: Send + Sync {
    type Transport: MailTransport;

    /// Connect and authenticate.
    async fn connect(&self) -> Result<Self::Transport, MailError>;
}
