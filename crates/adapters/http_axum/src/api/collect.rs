//! Authenticated trigger for a collection run.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use wattlog_app::collection::CollectionReport;
use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};

use crate::error::ApiError;
use crate::state::AppState;

/// Body of a completed run. Per-meter failures are listed in the report and
/// do not change the status code.
#[derive(Serialize)]
pub struct CollectBody {
    pub execution_ms: u64,
    pub report: CollectionReport,
}

/// Possible responses from the collect endpoint.
pub enum CollectResponse {
    Ok(Json<CollectBody>),
}

impl IntoResponse for CollectResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

fn authorize(headers: &HeaderMap, secret: Option<&str>) -> Result<(), ApiError> {
    let Some(secret) = secret else {
        tracing::error!("collection trigger called but no cron secret is configured");
        return Err(ApiError::CronSecretMissing);
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    match provided.and_then(|value| value.strip_prefix("Bearer ")) {
        Some(token) if token == secret => Ok(()),
        _ => {
            tracing::warn!(
                header_present = provided.is_some(),
                "rejected collection trigger"
            );
            Err(ApiError::Unauthorized)
        }
    }
}

/// `GET|POST /api/collect` with `Authorization: Bearer <secret>`
pub async fn run<MR, RR, TS>(
    State(state): State<AppState<MR, RR, TS>>,
    headers: HeaderMap,
) -> Result<CollectResponse, ApiError>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    authorize(&headers, state.cron_secret.as_deref())?;

    let started = Instant::now();
    let report = state.collection_job.run().await?;
    let execution_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    Ok(CollectResponse::Ok(Json(CollectBody {
        execution_ms,
        report,
    })))
}
