//! Shared application state for axum handlers.

use std::sync::Arc;

use wattlog_app::collection::CollectionJob;
use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};
use wattlog_app::services::meter_service::MeterService;
use wattlog_app::services::reading_service::ReadingService;

/// Application state shared across all axum handlers.
///
/// Generic over the repository and telemetry types to avoid dynamic dispatch.
/// `Clone` is implemented manually so the underlying types themselves do not
/// need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<MR, RR, TS> {
    /// Meter registry CRUD.
    pub meter_service: Arc<MeterService<MR>>,
    /// Reading queries and manual entries.
    pub reading_service: Arc<ReadingService<MR, RR>>,
    /// Job run by `/api/collect`.
    pub collection_job: Arc<CollectionJob<MR, RR, TS>>,
    /// Bearer secret guarding `/api/collect`; `None` disables the trigger.
    pub cron_secret: Option<Arc<str>>,
}

impl<MR, RR, TS> Clone for AppState<MR, RR, TS> {
    fn clone(&self) -> Self {
        Self {
            meter_service: Arc::clone(&self.meter_service),
            reading_service: Arc::clone(&self.reading_service),
            collection_job: Arc::clone(&self.collection_job),
            cron_secret: self.cron_secret.clone(),
        }
    }
}

impl<MR, RR, TS> AppState<MR, RR, TS>
where
    MR: MeterRepository + Send + Sync + 'static,
    RR: ReadingRepository + Send + Sync + 'static,
    TS: TelemetrySource + Send + Sync + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        meter_service: MeterService<MR>,
        reading_service: ReadingService<MR, RR>,
        collection_job: CollectionJob<MR, RR, TS>,
        cron_secret: Option<String>,
    ) -> Self {
        Self::from_arcs(
            Arc::new(meter_service),
            Arc::new(reading_service),
            Arc::new(collection_job),
            cron_secret,
        )
    }

    /// Create a new application state from pre-wrapped `Arc` services.
    ///
    /// Use this when the collection job is shared with the background
    /// scheduler.
    pub fn from_arcs(
        meter_service: Arc<MeterService<MR>>,
        reading_service: Arc<ReadingService<MR, RR>>,
        collection_job: Arc<CollectionJob<MR, RR, TS>>,
        cron_secret: Option<String>,
    ) -> Self {
        Self {
            meter_service,
            reading_service,
            collection_job,
            cron_secret: cron_secret
                .filter(|secret| !secret.is_empty())
                .map(Arc::from),
        }
    }
}
