//! Collection job — one sequential sweep over every active meter.
//!
//! For each meter the job fetches the device status, stores the recognized
//! raw values at the top of the current hour, feeds cumulative counters to the
//! [`DerivationEngine`], records the device as online and finally touches the
//! meter's `last_reading_at`. A failing meter is logged and reported; it never
//! stops the sweep.

use std::time::Duration;

use serde::Serialize;

use wattlog_domain::error::{NotFoundError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::telemetry::{Observation, ProfileRegistry, TelemetryPoint};
use wattlog_domain::time::{Timestamp, now, truncate_to_hour};

use crate::derivation::{DerivationEngine, DerivedResult};
use crate::ports::{MeterRepository, ReadingRepository, TelemetrySource};

/// Tunables for a [`CollectionJob`].
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Upper bound on a single device status fetch.
    pub fetch_timeout: Duration,
    /// Store reverse counters and derive injection from them.
    pub track_injection: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            track_injection: true,
        }
    }
}

/// Summary of one collection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionReport {
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    /// Meters whose pass completed without error.
    pub meters_processed: usize,
    /// Raw, derived and status readings written across all meters.
    pub readings_written: usize,
    /// Counter drops detected across all meters.
    pub resets_detected: usize,
    /// One message per failed meter.
    pub errors: Vec<String>,
}

impl CollectionReport {
    /// Whether every active meter was processed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// What a device reports right now, without storing anything.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveStatus {
    pub meter_id: MeterId,
    pub name: String,
    pub device_id: String,
    /// `false` when the fetch failed or timed out.
    pub online: bool,
    pub observed_at: Timestamp,
    /// Raw vendor points, empty when offline.
    pub points: Vec<TelemetryPoint>,
    /// Points the device profile recognizes, normalized.
    pub observations: Vec<Observation>,
    /// Why the device could not be reached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Why a single meter's pass failed.
#[derive(Debug, thiserror::Error)]
enum MeterFailure {
    #[error("no device id configured")]
    MissingDeviceId,

    #[error("telemetry fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Wattlog(#[from] WattlogError),
}

#[derive(Debug, Default)]
struct MeterOutcome {
    written: usize,
    resets: usize,
}

/// Orchestrates telemetry fetches, raw writes and delta derivation.
pub struct CollectionJob<MR, RR, TS> {
    meters: MR,
    engine: DerivationEngine<RR>,
    telemetry: TS,
    profiles: ProfileRegistry,
    config: CollectionConfig,
}

impl<MR, RR, TS> CollectionJob<MR, RR, TS>
where
    MR: MeterRepository,
    RR: ReadingRepository,
    TS: TelemetrySource,
{
    /// Create a new job.
    pub fn new(
        meters: MR,
        readings: RR,
        telemetry: TS,
        profiles: ProfileRegistry,
        config: CollectionConfig,
    ) -> Self {
        Self {
            meters,
            engine: DerivationEngine::new(readings),
            telemetry,
            profiles,
            config,
        }
    }

    /// Run a sweep observed at the current time.
    ///
    /// # Errors
    ///
    /// Returns an error only when the meter registry cannot be read before
    /// the sweep starts. Per-meter failures end up in
    /// [`CollectionReport::errors`].
    pub async fn run(&self) -> Result<CollectionReport, WattlogError> {
        self.run_at(now()).await
    }

    /// Run a sweep as if observed at `observed_at`.
    ///
    /// Readings are stamped with `observed_at` truncated to the hour.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, observed_at: Timestamp) -> Result<CollectionReport, WattlogError> {
        let started_at = now();
        let meters = self.meters.get_active().await?;
        tracing::info!(meters = meters.len(), "collection run started");

        let mut report = CollectionReport {
            started_at,
            finished_at: started_at,
            meters_processed: 0,
            readings_written: 0,
            resets_detected: 0,
            errors: Vec::new(),
        };

        for meter in &meters {
            match self.collect_meter(meter, observed_at).await {
                Ok(outcome) => {
                    report.meters_processed += 1;
                    report.readings_written += outcome.written;
                    report.resets_detected += outcome.resets;
                }
                Err(err) => {
                    let message = format!("meter {} ({}): {}", meter.name, meter.id, describe(&err));
                    tracing::warn!(meter_id = %meter.id, error = %message, "meter collection failed");
                    report.errors.push(message);
                }
            }
        }

        report.finished_at = now();
        tracing::info!(
            processed = report.meters_processed,
            written = report.readings_written,
            resets = report.resets_detected,
            failed = report.errors.len(),
            "collection run finished"
        );
        Ok(report)
    }

    /// Fetch the current device status of one meter.
    ///
    /// An unreachable device is reported as `online: false` with the reason,
    /// not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] when the meter is unknown or has no
    /// device id, or a storage error from the registry.
    #[tracing::instrument(skip(self))]
    pub async fn live_status(&self, meter_id: MeterId) -> Result<LiveStatus, WattlogError> {
        let meter = self
            .meters
            .get_by_id(meter_id)
            .await?
            .ok_or_else(|| NotFoundError {
                entity: "Meter",
                id: meter_id.to_string(),
            })?;
        let device_id = meter.device_id().ok_or_else(|| NotFoundError {
            entity: "Device for meter",
            id: meter_id.to_string(),
        })?;

        let fetched =
            tokio::time::timeout(self.config.fetch_timeout, self.telemetry.current_status(device_id))
                .await;
        let (points, error) = match fetched {
            Ok(Ok(points)) => (points, None),
            Ok(Err(err)) => (Vec::new(), Some(describe_wattlog(&err))),
            Err(_) => (
                Vec::new(),
                Some(MeterFailure::Timeout(self.config.fetch_timeout).to_string()),
            ),
        };
        let observations = self.profiles.resolve(device_id).recognize(&points);

        Ok(LiveStatus {
            meter_id,
            name: meter.name.clone(),
            device_id: device_id.to_owned(),
            online: error.is_none(),
            observed_at: now(),
            points,
            observations,
            error,
        })
    }

    #[tracing::instrument(skip(self, meter), fields(meter_id = %meter.id, meter = %meter.name))]
    async fn collect_meter(
        &self,
        meter: &Meter,
        observed_at: Timestamp,
    ) -> Result<MeterOutcome, MeterFailure> {
        let device_id = meter.device_id().ok_or(MeterFailure::MissingDeviceId)?;
        let timestamp = truncate_to_hour(observed_at);

        let fetched =
            tokio::time::timeout(self.config.fetch_timeout, self.telemetry.current_status(device_id))
                .await;
        let points = match fetched {
            Ok(Ok(points)) => points,
            Ok(Err(err)) => {
                self.mark_online(meter.id, timestamp, false).await;
                return Err(err.into());
            }
            Err(_) => {
                self.mark_online(meter.id, timestamp, false).await;
                return Err(MeterFailure::Timeout(self.config.fetch_timeout));
            }
        };

        let mut outcome = MeterOutcome::default();
        let profile = self.profiles.resolve(device_id);
        for observation in profile.recognize(&points) {
            if observation.kind == ReadingKind::CumulativeEnergyReverse
                && !self.config.track_injection
            {
                continue;
            }

            let raw = Reading::builder()
                .meter_id(meter.id)
                .kind(observation.kind)
                .value(observation.value)
                .unit(observation.unit.clone())
                .timestamp(timestamp)
                .build()?;
            // A rerun within the hour keeps the first stored sample, so the
            // derivation must use that value too or the next hour counts the
            // difference twice.
            let sample = if self.engine.repository().insert_if_absent(raw).await? {
                outcome.written += 1;
                Some(observation.value)
            } else {
                self.engine
                    .repository()
                    .find_exact(meter.id, observation.kind, timestamp)
                    .await?
                    .map(|stored| stored.value)
            };

            if let Some(derived_kind) = observation.kind.derived_counterpart() {
                let Some(value) = sample else {
                    tracing::debug!(kind = %observation.kind, "stored sample vanished, skipping derivation");
                    continue;
                };
                let result = self
                    .engine
                    .derive_delta(meter.id, observation.kind, derived_kind, value, timestamp)
                    .await?;
                match result {
                    DerivedResult::Written { .. } => outcome.written += 1,
                    DerivedResult::ResetDetected { .. } => outcome.resets += 1,
                    DerivedResult::FirstObservation
                    | DerivedResult::NoChange
                    | DerivedResult::DuplicatePeriod => {}
                }
            }
        }

        if self.write_online(meter.id, timestamp, true).await? {
            outcome.written += 1;
        }
        self.meters.touch_last_reading(meter.id, now()).await?;

        tracing::debug!(written = outcome.written, "meter collected");
        Ok(outcome)
    }

    async fn write_online(
        &self,
        meter_id: MeterId,
        timestamp: Timestamp,
        online: bool,
    ) -> Result<bool, WattlogError> {
        let reading = Reading::builder()
            .meter_id(meter_id)
            .kind(ReadingKind::OnlineStatus)
            .value(if online { 1.0 } else { 0.0 })
            .timestamp(timestamp)
            .build()?;
        self.engine.repository().insert_if_absent(reading).await
    }

    /// Best-effort status write on the failure path; the fetch error is what
    /// gets reported.
    async fn mark_online(&self, meter_id: MeterId, timestamp: Timestamp, online: bool) {
        if let Err(err) = self.write_online(meter_id, timestamp, online).await {
            tracing::debug!(error = %describe_wattlog(&err), "could not record online status");
        }
    }
}

fn describe(err: &MeterFailure) -> String {
    match err {
        MeterFailure::Wattlog(inner) => describe_wattlog(inner),
        other => other.to_string(),
    }
}

/// Render an error with its source chain, `outer: inner: …`.
fn describe_wattlog(err: &WattlogError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
