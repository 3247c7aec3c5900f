//! JSON REST handlers for readings and consumption summaries.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Duration;
use serde::Deserialize;

use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};
use wattlog_app::services::reading_service::{
    ConsumptionSummary, ManualReading, ReadingQuery, Recorded,
};
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::time::now;

use super::{parse_meter_id, parse_optional_timestamp};
use crate::error::ApiError;
use crate::state::AppState;

/// Default number of readings returned by listings.
const DEFAULT_LIMIT: usize = 100;

/// Default time range: last 24 hours.
const DEFAULT_HOURS: i64 = 24;

/// Query parameters for a meter's readings.
#[derive(Deserialize)]
pub struct ReadingsQuery {
    /// Only readings of this kind (e.g. `derived_consumption`).
    pub kind: Option<String>,
    /// Start of time range (RFC 3339). Defaults to 24 hours before `to`.
    pub from: Option<String>,
    /// End of time range (RFC 3339). Defaults to now.
    pub to: Option<String>,
    /// Maximum number of records. Defaults to 100.
    pub limit: Option<usize>,
}

/// Query parameters for the consumption summary.
#[derive(Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query parameters for the latest readings.
#[derive(Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Request body for a manual reading.
#[derive(Deserialize)]
pub struct CreateReadingRequest {
    /// Defaults to `power`.
    pub kind: Option<String>,
    pub value: f64,
    pub unit: Option<String>,
    /// RFC 3339; defaults to now.
    pub timestamp: Option<String>,
}

/// Possible responses from the listing endpoints.
pub enum ListResponse {
    Ok(Json<Vec<Reading>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the manual reading endpoint.
pub enum CreateResponse {
    /// A new reading was stored.
    Created(Json<Reading>),
    /// A reading with the same meter, kind and timestamp already existed.
    Existing(Json<Reading>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Existing(json) => json.into_response(),
        }
    }
}

/// Possible responses from the consumption endpoint.
pub enum ConsumptionResponse {
    Ok(Json<ConsumptionSummary>),
}

impl IntoResponse for ConsumptionResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/meters/{id}/readings?kind=&from=&to=&limit=`
pub async fn list_for_meter<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
    Query(params): Query<ReadingsQuery>,
) -> Result<ListResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let kind = params
        .kind
        .as_deref()
        .map(ReadingKind::from_str)
        .transpose()?;
    let to = parse_optional_timestamp(params.to.as_deref())?.unwrap_or_else(now);
    let from = parse_optional_timestamp(params.from.as_deref())?
        .unwrap_or_else(|| to - Duration::hours(DEFAULT_HOURS));

    let readings = state
        .reading_service
        .list_for_meter(
            meter_id,
            ReadingQuery {
                kind,
                from,
                to,
                limit: params.limit.unwrap_or(DEFAULT_LIMIT),
            },
        )
        .await?;

    Ok(ListResponse::Ok(Json(readings)))
}

/// `POST /api/meters/{id}/readings`
pub async fn create<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
    Json(req): Json<CreateReadingRequest>,
) -> Result<CreateResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let kind = req
        .kind
        .as_deref()
        .map(ReadingKind::from_str)
        .transpose()?
        .unwrap_or(ReadingKind::Power);
    let manual = ManualReading {
        kind,
        value: req.value,
        unit: req.unit,
        timestamp: parse_optional_timestamp(req.timestamp.as_deref())?,
    };

    let Recorded { reading, created } =
        state.reading_service.record_manual(meter_id, manual).await?;
    if created {
        Ok(CreateResponse::Created(Json(reading)))
    } else {
        Ok(CreateResponse::Existing(Json(reading)))
    }
}

/// `GET /api/meters/{id}/consumption?from=&to=`
pub async fn consumption<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<ConsumptionResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let to = parse_optional_timestamp(params.to.as_deref())?.unwrap_or_else(now);
    let from = parse_optional_timestamp(params.from.as_deref())?
        .unwrap_or_else(|| to - Duration::hours(DEFAULT_HOURS));

    let summary = state
        .reading_service
        .consumption_summary(meter_id, from, to)
        .await?;
    Ok(ConsumptionResponse::Ok(Json(summary)))
}

/// `GET /api/readings?limit=`
pub async fn recent<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Query(params): Query<RecentQuery>,
) -> Result<ListResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let readings = state
        .reading_service
        .recent(params.limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    Ok(ListResponse::Ok(Json(readings)))
}
