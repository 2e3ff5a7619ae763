//! Owns the mail session: connect, open, scan, pump, and reconnect on loss.

use std::time::Duration;

use mail_bridge::{MailConnector, MailError, MailTransport};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::config::RechargeConfig;
use crate::deadline::DeadlineTransport;
use crate::ledger::CreditLedger;
use crate::pump::Pump;
use crate::router::MessageRouter;
use crate::scanner;
use crate::state::{MailboxPhase, RechargeStatus, SessionState, StatusBoard};
use crate::trigger::RechargeTrigger;
use crate::RechargeError;

/// How a session ended.
struct SessionEnd {
    /// At least one IDLE wait completed before the failure.
    healthy: bool,
    error: MailError,
}

/// Runs the recharge subsystem on a single mail connection.
pub struct RechargeSupervisor<C, L> {
    connector: C,
    router: MessageRouter<L>,
    config: RechargeConfig,
    status: StatusBoard,
}

impl<C, L> RechargeSupervisor<C, L>
where
    C: MailConnector + 'static,
    L: CreditLedger + 'static,
{
    pub fn new(connector: C, ledger: L, config: RechargeConfig) -> Self {
        let trigger = RechargeTrigger::new(config.trigger_subject.clone());
        Self {
            connector,
            router: MessageRouter::new(trigger, ledger),
            config,
            status: StatusBoard::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RechargeStatus> {
        self.status.subscribe()
    }

    /// Run on a background task.
    pub fn spawn(self) -> RechargeHandle {
        let status = self.subscribe();
        let task = tokio::spawn(self.run());
        RechargeHandle { task, status }
    }

    /// Keep a session alive until the reconnect budget runs out.
    ///
    /// The backoff only resets after a session completes an IDLE wait, so a
    /// server that drops every session right after `SELECT` is still backed off.
    pub async fn run(self) -> RechargeError {
        let mut failures: u32 = 0;
        let mut sessions: u32 = 0;

        loop {
            self.status.set_session(SessionState::Connecting);
            let end = self.run_session(&mut sessions).await;

            self.status.set_session(SessionState::Error);
            if end.healthy {
                failures = 0;
            }

            if !self.config.reconnect.should_retry(failures) {
                error!(attempts = failures, "Giving up on the mail session: {}", end.error);
                self.status.set_session(SessionState::Disconnected);
                return RechargeError::RetriesExhausted {
                    attempts: failures,
                    last_error: end.error.to_string(),
                };
            }

            let delay = self.config.reconnect.delay_for_attempt(failures);
            failures += 1;
            warn!(
                attempt = failures,
                ?delay,
                "Mail session lost, reconnecting: {}",
                end.error
            );
            sleep(delay).await;
        }
    }

    async fn run_session(&self, sessions: &mut u32) -> SessionEnd {
        let op_timeout = self.config.op_timeout;
        let lost = |error: MailError| SessionEnd {
            healthy: false,
            error,
        };

        let inner = match timeout(op_timeout, self.connector.connect()).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(e)) => return lost(e),
            Err(_) => {
                return lost(MailError::Timeout {
                    operation: "connect",
                    elapsed: op_timeout,
                })
            }
        };
        let mut transport = DeadlineTransport::new(inner, op_timeout);
        self.status.set_session(SessionState::Ready);

        self.status.set_mailbox(MailboxPhase::Opening);
        let mailbox = match transport.open_mailbox(&self.config.mailbox, false).await {
            Ok(mailbox) => mailbox,
            Err(e) => {
                self.close(&mut transport).await;
                return lost(e);
            }
        };

        if *sessions > 0 {
            self.status.record_reconnect();
        }
        *sessions += 1;
        info!(mailbox = %mailbox.name, exists = mailbox.exists, "Mailbox open");

        self.status.set_mailbox(MailboxPhase::Scanning);
        let report = scanner::reconcile(&mut transport, &self.router).await;
        self.status.record_grants(report.granted);

        self.status.set_mailbox(MailboxPhase::Subscribed);
        let mut pump = Pump::new(mailbox.exists);
        let error = pump
            .run(&mut transport, &self.router, self.config.idle_timeout, &self.status)
            .await;

        self.close(&mut transport).await;
        SessionEnd {
            healthy: pump.completed_waits() > 0,
            error,
        }
    }

    /// Best-effort logout when the session is still usable.
    async fn close<T: MailTransport>(&self, transport: &mut DeadlineTransport<T>) {
        self.status.set_mailbox(MailboxPhase::Closed);
        if transport.is_broken() {
            return;
        }
        if let Err(e) = transport.logout().await {
            warn!("Logout failed: {}", e);
        }
    }
}

/// Handle to a spawned [`RechargeSupervisor`].
pub struct RechargeHandle {
    task: JoinHandle<RechargeError>,
    status: watch::Receiver<RechargeStatus>,
}

impl RechargeHandle {
    /// Latest published status.
    pub fn status(&self) -> RechargeStatus {
        *self.status.borrow()
    }

    /// Receiver for status changes.
    pub fn subscribe(&self) -> watch::Receiver<RechargeStatus> {
        self.status.clone()
    }

    /// Wait until the status satisfies `predicate`, or `limit` passes.
    pub async fn wait_for(
        &self,
        limit: Duration,
        predicate: impl FnMut(&RechargeStatus) -> bool,
    ) -> Option<RechargeStatus> {
        let mut rx = self.status.clone();
        let status = match timeout(limit, rx.wait_for(predicate)).await {
            Ok(Ok(status)) => Some(*status),
            _ => None,
        };
        status
    }

    /// Stop the supervisor. Pending mail commands are dropped mid-flight.
    pub async fn shutdown(self) {
        self.task.abort();
        match self.task.await {
            Ok(e) => warn!("Recharge supervisor had already stopped: {}", e),
            Err(e) if e.is_cancelled() => info!("Recharge supervisor stopped"),
            Err(e) => error!("Recharge supervisor panicked: {}", e),
        }
    }
}
