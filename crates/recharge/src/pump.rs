//! Live notification pump.
//!
//! Each IDLE wake-up turns `EXISTS` events into fetch ranges on a FIFO work
//! queue, which is drained strictly in arrival order on the same connection.

use std::collections::VecDeque;
use std::time::Duration;

use mail_bridge::{FetchRange, MailError, MailEvent, MailTransport};
use tracing::{debug, info, warn};

use crate::ledger::CreditLedger;
use crate::router::MessageRouter;
use crate::scanner::{self, ScanReport};
use crate::state::StatusBoard;

/// Tracks the mailbox size and the ranges still to fetch.
#[derive(Debug)]
pub struct Pump {
    known: u32,
    queue: VecDeque<FetchRange>,
    waits: u64,
}

impl Pump {
    /// Start from the message count reported when the mailbox was opened.
    pub fn new(known: u32) -> Self {
        Self {
            known,
            queue: VecDeque::new(),
            waits: 0,
        }
    }

    /// Highest sequence number already accounted for.
    pub fn known(&self) -> u32 {
        self.known
    }

    /// IDLE waits that returned without an error.
    pub fn completed_waits(&self) -> u64 {
        self.waits
    }

    /// Work items waiting to be fetched.
    pub fn pending(&self) -> impl Iterator<Item = &FetchRange> {
        self.queue.iter()
    }

    /// Apply one mailbox event.
    pub fn observe(&mut self, event: MailEvent) {
        match event {
            MailEvent::Exists(n) if n > self.known => {
                let range = FetchRange::Span {
                    start: self.known + 1,
                    end: n,
                };
                debug!(?range, "Queued new messages");
                self.queue.push_back(range);
                self.known = n;
            }
            MailEvent::Exists(n) => {
                debug!(exists = n, known = self.known, "No new messages to fetch");
                self.known = n;
            }
            MailEvent::Expunge(seq) => {
                debug!(seq, "Message expunged");
                self.known = self.known.saturating_sub(1);
                self.shift_after_expunge(seq);
            }
        }
    }

    /// Renumber queued ranges after message `seq` was removed.
    fn shift_after_expunge(&mut self, seq: u32) {
        for item in self.queue.iter_mut() {
            if let FetchRange::Span { start, end } = item {
                if seq < *start {
                    *start -= 1;
                    *end -= 1;
                } else if seq <= *end {
                    *end = end.saturating_sub(1);
                }
            }
        }
        self.queue
            .retain(|item| !matches!(item, FetchRange::Span { start, end } if start > end));
    }

    /// Fetch and route every queued range, oldest first.
    ///
    /// A rejected fetch drops its item and moves on; a lost connection stops
    /// the drain and is returned.
    pub async fn drain<T, L>(
        &mut self,
        transport: &mut T,
        router: &MessageRouter<L>,
    ) -> Result<ScanReport, MailError>
    where
        T: MailTransport + ?Sized,
        L: CreditLedger,
    {
        let mut report = ScanReport::default();

        while let Some(range) = self.queue.pop_front() {
            let batch = match transport.fetch_headers(&range).await {
                Ok(batch) => batch,
                Err(e) if e.is_connection_loss() => return Err(e),
                Err(e) => {
                    warn!(?range, "Fetch failed, skipping: {}", e);
                    report.interrupted = true;
                    continue;
                }
            };
            report.merge(router.route_batch(transport, batch).await?);
        }

        Ok(report)
    }

    /// Wait for mail and route it until the session fails.
    ///
    /// Every `idle_timeout` without news re-runs the reconciliation scan,
    /// which also retries grants the store rejected earlier.
    pub async fn run<T, L>(
        &mut self,
        transport: &mut T,
        router: &MessageRouter<L>,
        idle_timeout: Duration,
        status: &StatusBoard,
    ) -> MailError
    where
        T: MailTransport + ?Sized,
        L: CreditLedger,
    {
        info!(known = self.known, "Listening for new mail");

        loop {
            let events = match transport.wait_for_mail(idle_timeout).await {
                Ok(events) => events,
                Err(e) => return e,
            };
            self.waits += 1;

            if events.is_empty() {
                debug!("IDLE keepalive elapsed, rescanning");
                let report = scanner::reconcile(transport, router).await;
                status.record_grants(report.granted);
                continue;
            }

            for event in events {
                self.observe(event);
            }

            match self.drain(transport, router).await {
                Ok(report) => {
                    status.record_grants(report.granted);
                    if report.total() > 0 {
                        info!(
                            granted = report.granted,
                            routed = report.total(),
                            "Processed new mail"
                        );
                    }
                }
                Err(e) => return e,
            }
        }
    }
}
