//! Registration and balance lookup.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use database::UserCredit;
use serde::{Deserialize, Serialize};

use crate::caller::CallerEmail;
use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct Balance {
    pub email: String,
    pub credits: i64,
}

/// `POST /api/users`: first login creates the account; repeats are no-ops.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserCredit>)> {
    let user = state.gate.register(&request.email).await?;
    Ok((StatusCode::OK, Json(user)))
}

/// `GET /api/credits`
pub async fn credits(
    State(state): State<AppState>,
    CallerEmail(email): CallerEmail,
) -> Result<Json<Balance>> {
    let credits = state.gate.balance(&email).await?;
    Ok(Json(Balance { email, credits }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ApiError;
    use crate::gate::tests::{test_db, FixedClassifier, RecordingNotifier};
    use crate::gate::CreditGate;

    async fn state() -> AppState {
        let gate = CreditGate::new(
            test_db().await,
            Arc::new(FixedClassifier::answering("Ada")),
            Arc::new(RecordingNotifier::default()),
        );
        AppState::new(gate, None)
    }

    #[tokio::test]
    async fn test_register_then_balance() {
        let state = state().await;

        let (status, Json(user)) = register(
            State(state.clone()),
            Json(RegisterRequest {
                email: "New@X.com".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user.email, "new@x.com");
        assert_eq!(user.credits, 5);

        let Json(balance) = credits(State(state), CallerEmail("new@x.com".to_string()))
            .await
            .unwrap();
        assert_eq!(balance.credits, 5);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_address() {
        let result = register(
            State(state().await),
            Json(RegisterRequest {
                email: "nope".to_string(),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }
}
