//! Reconciliation scan over already-delivered recharge requests.
//!
//! Runs after every mailbox open, before the pump subscribes, so requests
//! that arrived while the session was down are not lost.

use mail_bridge::{FetchRange, MailTransport};
use tracing::{debug, info, warn};

use crate::ledger::CreditLedger;
use crate::router::{Disposition, MessageRouter};

/// Messages fetched per round trip.
const SCAN_BATCH_SIZE: usize = 50;

/// Tally of routed messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub granted: usize,
    pub already_funded: usize,
    pub unknown_user: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub failed: usize,
    /// The scan stopped early on a mail store error.
    pub interrupted: bool,
}

impl ScanReport {
    pub fn record(&mut self, disposition: &Disposition) {
        match disposition {
            Disposition::Granted { .. } => self.granted += 1,
            Disposition::AlreadyFunded { .. } => self.already_funded += 1,
            Disposition::UnknownUser { .. } => self.unknown_user += 1,
            Disposition::Ignored => self.ignored += 1,
            Disposition::Malformed => self.malformed += 1,
            Disposition::Failed { .. } => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: ScanReport) {
        self.granted += other.granted;
        self.already_funded += other.already_funded;
        self.unknown_user += other.unknown_user;
        self.ignored += other.ignored;
        self.malformed += other.malformed;
        self.failed += other.failed;
        self.interrupted |= other.interrupted;
    }

    /// Messages routed, whatever their outcome.
    pub fn total(&self) -> usize {
        self.granted
            + self.already_funded
            + self.unknown_user
            + self.ignored
            + self.malformed
            + self.failed
    }
}

/// Find unseen recharge requests and route them.
///
/// Mail store errors end the scan early and are logged, never returned: the
/// caller subscribes regardless, and a dead connection surfaces there.
pub async fn reconcile<T, L>(transport: &mut T, router: &MessageRouter<L>) -> ScanReport
where
    T: MailTransport + ?Sized,
    L: CreditLedger,
{
    let mut report = ScanReport::default();

    let ids = match transport.search(&router.trigger().search_query()).await {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Reconciliation search failed: {}", e);
            report.interrupted = true;
            return report;
        }
    };

    if ids.is_empty() {
        debug!("No pending recharge requests");
        return report;
    }
    info!("Found {} pending recharge candidates", ids.len());

    for chunk in ids.chunks(SCAN_BATCH_SIZE) {
        let batch = match transport.fetch_headers(&FetchRange::Ids(chunk.to_vec())).await {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Reconciliation fetch failed: {}", e);
                report.interrupted = true;
                break;
            }
        };

        match router.route_batch(transport, batch).await {
            Ok(batch_report) => report.merge(batch_report),
            Err(e) => {
                warn!("Reconciliation stopped: {}", e);
                report.interrupted = true;
                break;
            }
        }
    }

    info!(
        granted = report.granted,
        already_funded = report.already_funded,
        unknown_user = report.unknown_user,
        ignored = report.ignored,
        malformed = report.malformed,
        failed = report.failed,
        interrupted = report.interrupted,
        "Reconciliation scan complete"
    );
    report
}
