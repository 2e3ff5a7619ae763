//! `POST /api/query`

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::caller::CallerEmail;
use crate::error::Result;
use crate::gate::Answer;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

pub async fn query(
    State(state): State<AppState>,
    CallerEmail(email): CallerEmail,
    Json(request): Json<QueryRequest>,
) -> Result<Json<Answer>> {
    let answer = state.gate.answer(&email, &request.query).await?;
    Ok(Json(answer))
}
