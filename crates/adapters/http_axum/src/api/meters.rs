//! JSON REST handlers for the meter registry.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use wattlog_app::collection::LiveStatus;
use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};
use wattlog_app::services::meter_service::MeterUpdate;
use wattlog_domain::meter::Meter;

use super::parse_meter_id;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a meter.
#[derive(Deserialize)]
pub struct CreateMeterRequest {
    pub name: String,
    pub location: Option<String>,
    pub device_id: Option<String>,
    pub active: Option<bool>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Meter>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get and update endpoints.
pub enum GetResponse {
    Ok(Json<Meter>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the live status endpoint.
pub enum StatusResponse {
    Ok(Json<LiveStatus>),
}

impl IntoResponse for StatusResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Meter>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/meters`
pub async fn list<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
) -> Result<ListResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meters = state.meter_service.list_meters().await?;
    Ok(ListResponse::Ok(Json(meters)))
}

/// `GET /api/meters/{id}`
pub async fn get<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let meter = state.meter_service.get_meter(meter_id).await?;
    Ok(GetResponse::Ok(Json(meter)))
}

/// `GET /api/meters/{id}/status`
pub async fn status<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
) -> Result<StatusResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let live = state.collection_job.live_status(meter_id).await?;
    Ok(StatusResponse::Ok(Json(live)))
}

/// `POST /api/meters`
pub async fn create<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Json(req): Json<CreateMeterRequest>,
) -> Result<CreateResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let mut builder = Meter::builder().name(req.name);
    if let Some(location) = req.location {
        builder = builder.location(location);
    }
    if let Some(device_id) = req.device_id {
        builder = builder.device_id(device_id);
    }
    if let Some(active) = req.active {
        builder = builder.active(active);
    }

    let meter = builder.build()?;
    let created = state.meter_service.register_meter(meter).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PUT /api/meters/{id}`
pub async fn update<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
    Json(update): Json<MeterUpdate>,
) -> Result<GetResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    let meter = state.meter_service.update_meter(meter_id, update).await?;
    Ok(GetResponse::Ok(Json(meter)))
}

/// `DELETE /api/meters/{id}`
pub async fn delete<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    let meter_id = parse_meter_id(&id)?;
    state.meter_service.delete_meter(meter_id).await?;
    Ok(DeleteResponse::NoContent)
}
