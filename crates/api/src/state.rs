//! Application state shared across handlers.

use std::sync::Arc;

use recharge::RechargeStatus;
use tokio::sync::watch;

use crate::gate::CreditGate;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Query path.
    pub gate: Arc<CreditGate>,
    /// Recharge supervisor status, absent when the mailbox is not watched.
    pub recharge: Option<watch::Receiver<RechargeStatus>>,
}

impl AppState {
    /// Create new application state.
    pub fn new(gate: CreditGate, recharge: Option<watch::Receiver<RechargeStatus>>) -> Self {
        Self {
            gate: Arc::new(gate),
            recharge,
        }
    }
}
