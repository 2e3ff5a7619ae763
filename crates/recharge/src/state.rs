//! Observable state of the recharge subsystem.

use std::fmt;

use tokio::sync::watch;

/// Lifecycle of the mail session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Ready,
    /// The last session failed; a reconnect is pending.
    Error,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Ready => "ready",
            SessionState::Error => "error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of the watched mailbox within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxPhase {
    Closed,
    Opening,
    /// Open, reconciliation scan running.
    Scanning,
    /// Open, waiting on IDLE.
    Subscribed,
}

impl MailboxPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailboxPhase::Closed => "closed",
            MailboxPhase::Opening => "opening",
            MailboxPhase::Scanning => "scanning",
            MailboxPhase::Subscribed => "subscribed",
        }
    }
}

impl fmt::Display for MailboxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot published on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RechargeStatus {
    pub session: SessionState,
    pub mailbox: MailboxPhase,
    /// Sessions established since start, minus the first.
    pub reconnects: u32,
    /// Credits granted since start.
    pub grants: u64,
}

impl Default for RechargeStatus {
    fn default() -> Self {
        Self {
            session: SessionState::Disconnected,
            mailbox: MailboxPhase::Closed,
            reconnects: 0,
            grants: 0,
        }
    }
}

/// Publishes [`RechargeStatus`] over a watch channel.
#[derive(Debug)]
pub struct StatusBoard {
    tx: watch::Sender<RechargeStatus>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(RechargeStatus::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<RechargeStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> RechargeStatus {
        *self.tx.borrow()
    }

    pub fn set_session(&self, session: SessionState) {
        self.tx.send_if_modified(|status| {
            let changed = status.session != session;
            status.session = session;
            // Mailboxes only stay open inside a ready session
            if session != SessionState::Ready && status.mailbox != MailboxPhase::Closed {
                status.mailbox = MailboxPhase::Closed;
                return true;
            }
            changed
        });
    }

    pub fn set_mailbox(&self, phase: MailboxPhase) {
        self.tx.send_if_modified(|status| {
            let changed = status.mailbox != phase;
            status.mailbox = phase;
            changed
        });
    }

    pub(crate) fn record_reconnect(&self) {
        self.tx.send_modify(|status| status.reconnects += 1);
    }

    pub(crate) fn record_grants(&self, count: usize) {
        if count > 0 {
            self.tx.send_modify(|status| status.grants += count as u64);
        }
    }
}
