//! JSON REST API handlers.

#[allow(clippy::missing_errors_doc)]
pub mod collect;
#[allow(clippy::missing_errors_doc)]
pub mod meters;
#[allow(clippy::missing_errors_doc)]
pub mod readings;

use std::str::FromStr;

use axum::Router;
use axum::routing::get;

use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};
use wattlog_domain::error::ValidationError;
use wattlog_domain::id::MeterId;
use wattlog_domain::time::{Timestamp, parse_rfc3339};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<MR, RR, TS>() -> Router<AppState<MR, RR, TS>>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    Router::new()
        // Meters
        .route(
            "/meters",
            get(meters::list::<MR, RR, TS>).post(meters::create::<MR, RR, TS>),
        )
        .route(
            "/meters/{id}",
            get(meters::get::<MR, RR, TS>)
                .put(meters::update::<MR, RR, TS>)
                .delete(meters::delete::<MR, RR, TS>),
        )
        .route("/meters/{id}/status", get(meters::status::<MR, RR, TS>))
        // Readings
        .route(
            "/meters/{id}/readings",
            get(readings::list_for_meter::<MR, RR, TS>).post(readings::create::<MR, RR, TS>),
        )
        .route(
            "/meters/{id}/consumption",
            get(readings::consumption::<MR, RR, TS>),
        )
        .route("/readings", get(readings::recent::<MR, RR, TS>))
        // Collection trigger
        .route(
            "/collect",
            get(collect::run::<MR, RR, TS>).post(collect::run::<MR, RR, TS>),
        )
}

fn parse_meter_id(raw: &str) -> Result<MeterId, ApiError> {
    MeterId::from_str(raw).map_err(|_| ValidationError::InvalidId(raw.to_owned()).into())
}

fn parse_timestamp(raw: &str) -> Result<Timestamp, ApiError> {
    parse_rfc3339(raw).map_err(|_| ValidationError::InvalidTimestamp(raw.to_owned()).into())
}

fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<Timestamp>, ApiError> {
    raw.map(parse_timestamp).transpose()
}
