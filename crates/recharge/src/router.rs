//! Parse, match and grant: the path every fetched message takes.

use database::GrantOutcome;
use mail_bridge::{MailError, MailTransport, RawMessage};
use tracing::{debug, error, info, warn};

use crate::ledger::CreditLedger;
use crate::scanner::ScanReport;
use crate::trigger::RechargeTrigger;

/// What happened to one fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The sender was at 0 and has been reset.
    Granted { email: String, credits: i64 },
    /// The sender still had credits; nothing changed.
    AlreadyFunded { email: String, credits: i64 },
    /// No account exists for the sender.
    UnknownUser { email: String },
    /// Not a recharge request.
    Ignored,
    /// The header section could not be decoded.
    Malformed,
    /// The credit store failed; a later scan retries.
    Failed { email: String },
}

impl Disposition {
    /// Whether the message is finished with and may be flagged `\Seen`.
    ///
    /// Messages that were not requests stay untouched, and failed grants
    /// stay unseen so the next reconciliation scan picks them up again.
    pub fn should_mark_seen(&self) -> bool {
        matches!(
            self,
            Disposition::Granted { .. }
                | Disposition::AlreadyFunded { .. }
                | Disposition::UnknownUser { .. }
        )
    }
}

/// Routes messages from the scanner and the pump to the ledger.
pub struct MessageRouter<L> {
    trigger: RechargeTrigger,
    ledger: L,
}

impl<L: CreditLedger> MessageRouter<L> {
    pub fn new(trigger: RechargeTrigger, ledger: L) -> Self {
        Self { trigger, ledger }
    }

    pub fn trigger(&self) -> &RechargeTrigger {
        &self.trigger
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Handle a single message.
    pub async fn route(&self, raw: RawMessage) -> Disposition {
        let parsed = match mail_bridge::parse(raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Dropping message: {}", e);
                return Disposition::Malformed;
            }
        };

        let Some(email) = self.trigger.matches(&parsed) else {
            debug!(seq = parsed.seq, subject = %parsed.subject, "Not a recharge request");
            return Disposition::Ignored;
        };
        let email = email.to_string();

        match self.ledger.grant_if_exhausted(&email).await {
            Ok(GrantOutcome::Granted { credits }) => {
                info!(seq = parsed.seq, email = %email, credits, "Credits recharged");
                Disposition::Granted { email, credits }
            }
            Ok(GrantOutcome::AlreadyFunded { credits }) => {
                info!(seq = parsed.seq, email = %email, credits, "Recharge skipped, balance not exhausted");
                Disposition::AlreadyFunded { email, credits }
            }
            Ok(GrantOutcome::UnknownUser) => {
                warn!(seq = parsed.seq, email = %email, "Recharge request from unknown user");
                Disposition::UnknownUser { email }
            }
            Err(e) => {
                error!(seq = parsed.seq, email = %email, "Recharge failed: {}", e);
                Disposition::Failed { email }
            }
        }
    }

    /// Route a fetched batch in sequence order, then flag the finished ones seen.
    ///
    /// Only a lost connection is returned as an error. A rejected flag write
    /// is logged; the messages stay unseen and are harmless to process again
    /// because grants only apply to exhausted balances.
    pub async fn route_batch<T>(
        &self,
        transport: &mut T,
        mut batch: Vec<RawMessage>,
    ) -> Result<ScanReport, MailError>
    where
        T: MailTransport + ?Sized,
    {
        batch.sort_by_key(|raw| raw.seq);

        let mut report = ScanReport::default();
        let mut finished = Vec::new();

        for raw in batch {
            let seq = raw.seq;
            let disposition = self.route(raw).await;
            if disposition.should_mark_seen() {
                finished.push(seq);
            }
            report.record(&disposition);
        }

        if !finished.is_empty() {
            if let Err(e) = transport.mark_seen(&finished).await {
                if e.is_connection_loss() {
                    return Err(e);
                }
                warn!("Failed to flag {} messages seen: {}", finished.len(), e);
            }
        }

        Ok(report)
    }
}
