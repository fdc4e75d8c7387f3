//! Web server module for receiving click pings.
//!
//! Links in the broadcast message point here. Each hit appends one event to
//! the click ledger and returns a fixed acknowledgment.

pub mod handlers;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use handlers::{
    click_root, click_user, health, list_clicks, AppState, HealthResponse, CLICK_ACK,
};

/// Build the click-tracking router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(click_root))
        .route("/click/:user", get(click_user))
        .route("/clicks", get(list_clicks))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
