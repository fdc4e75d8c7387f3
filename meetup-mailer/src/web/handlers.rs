//! Click endpoint handlers.
//!
//! A failed ledger write is logged and the visitor still gets the
//! acknowledgment; only the reporting side sees the gap.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::ledger::{ClickEvent, ClickLedger, ANONYMOUS_USER};

/// Body returned for every recorded click.
pub const CLICK_ACK: &str = "Thanks for clicking!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn ClickLedger>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn ClickLedger>) -> Self {
        Self { ledger }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Click Tracking
// =============================================================================

async fn record_click(state: &AppState, user: String) -> &'static str {
    let event = ClickEvent::now(user);
    info!(user = %event.user, time = %event.time, "click_received");

    if let Err(e) = state.ledger.append(event.clone()).await {
        error!(user = %event.user, error = %e, "click_persist_failed");
    }

    CLICK_ACK
}

/// `GET /` - the bare link, recorded under the anonymous user.
pub async fn click_root(State(state): State<AppState>) -> &'static str {
    record_click(&state, ANONYMOUS_USER.to_string()).await
}

/// `GET /click/:user` - the path segment arrives percent-decoded.
pub async fn click_user(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> &'static str {
    record_click(&state, user).await
}

/// `GET /clicks` - the full ledger as JSON.
pub async fn list_clicks(State(state): State<AppState>) -> Json<Vec<ClickEvent>> {
    let events = state.ledger.read_all().await;
    info!(total = events.len(), "clicks_listed");
    Json(events)
}
