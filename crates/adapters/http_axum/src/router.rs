//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` next to `/health`.
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<MR, RR, TS>(state: AppState<MR, RR, TS>) -> Router
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
