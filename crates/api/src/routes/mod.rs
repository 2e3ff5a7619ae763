//! Route handlers.

pub mod health;
pub mod query;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/users", post(users::register))
        .route("/api/credits", get(users::credits))
        .route("/api/query", post(query::query))
}
