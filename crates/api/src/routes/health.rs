//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recharge: Option<RechargeHealth>,
}

#[derive(Debug, Serialize)]
pub struct RechargeHealth {
    pub session: String,
    pub mailbox: String,
    pub reconnects: u32,
    pub grants: u64,
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<Health> {
    let recharge = state.recharge.as_ref().map(|rx| {
        let status = *rx.borrow();
        RechargeHealth {
            session: status.session.to_string(),
            mailbox: status.mailbox.to_string(),
            reconnects: status.reconnects,
            grants: status.grants,
        }
    });

    Json(Health {
        status: "ok".to_string(),
        recharge,
    })
}
