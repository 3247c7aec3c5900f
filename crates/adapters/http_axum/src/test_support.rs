//! Shared in-memory ports for router tests. Clones share their storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use wattlog_app::collection::{CollectionConfig, CollectionJob};
use wattlog_app::ports::{MeterRepository, ReadingRepository, TelemetrySource};
use wattlog_app::services::meter_service::MeterService;
use wattlog_app::services::reading_service::ReadingService;
use wattlog_domain::error::{DuplicateReadingError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::telemetry::{ProfileRegistry, TelemetryPoint};
use wattlog_domain::time::Timestamp;

use crate::state::AppState;

pub const SECRET: &str = "test-secret";

#[derive(Clone, Default)]
pub struct Meters(Arc<Mutex<HashMap<MeterId, Meter>>>);

#[derive(Clone, Default)]
pub struct Readings(Arc<Mutex<Vec<Reading>>>);

/// Every device reports the same counter.
#[derive(Clone, Default)]
pub struct FixedTelemetry(Vec<TelemetryPoint>);

impl MeterRepository for Meters {
    async fn create(&self, meter: Meter) -> Result<Meter, WattlogError> {
        self.0.lock().unwrap().insert(meter.id, meter.clone());
        Ok(meter)
    }

    async fn get_by_id(&self, id: MeterId) -> Result<Option<Meter>, WattlogError> {
        Ok(self.0.lock().unwrap().get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Meter>, WattlogError> {
        let mut all: Vec<Meter> = self.0.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn get_active(&self) -> Result<Vec<Meter>, WattlogError> {
        let mut all = self.get_all().await?;
        all.retain(|m| m.active);
        Ok(all)
    }

    async fn update(&self, meter: Meter) -> Result<Meter, WattlogError> {
        self.0.lock().unwrap().insert(meter.id, meter.clone());
        Ok(meter)
    }

    async fn delete(&self, id: MeterId) -> Result<(), WattlogError> {
        self.0.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn touch_last_reading(&self, id: MeterId, at: Timestamp) -> Result<(), WattlogError> {
        if let Some(meter) = self.0.lock().unwrap().get_mut(&id) {
            meter.last_reading_at = Some(at);
        }
        Ok(())
    }
}

impl ReadingRepository for Readings {
    async fn insert(&self, reading: Reading) -> Result<Reading, WattlogError> {
        let mut store = self.0.lock().unwrap();
        if store.iter().any(|r| {
            r.meter_id == reading.meter_id && r.kind == reading.kind && r.timestamp == reading.timestamp
        }) {
            return Err(DuplicateReadingError {
                meter_id: reading.meter_id.to_string(),
                kind: reading.kind,
                timestamp: reading.timestamp.to_rfc3339(),
            }
            .into());
        }
        store.push(reading.clone());
        Ok(reading)
    }

    async fn find_exact(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        timestamp: Timestamp,
    ) -> Result<Option<Reading>, WattlogError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.meter_id == meter_id && r.kind == kind && r.timestamp == timestamp)
            .cloned())
    }

    async fn find_latest_before(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        before: Timestamp,
    ) -> Result<Option<Reading>, WattlogError> {
        Ok(self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.meter_id == meter_id && r.kind == kind && r.timestamp < before)
            .max_by_key(|r| r.timestamp)
            .cloned())
    }

    async fn find_by_meter_in_range(
        &self,
        meter_id: MeterId,
        kind: Option<ReadingKind>,
        from: Timestamp,
        to: Timestamp,
        limit: Option<usize>,
    ) -> Result<Vec<Reading>, WattlogError> {
        let mut found: Vec<Reading> = self
            .0
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                r.meter_id == meter_id
                    && kind.is_none_or(|k| r.kind == k)
                    && r.timestamp >= from
                    && r.timestamp <= to
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        found.truncate(limit.unwrap_or(usize::MAX));
        Ok(found)
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<Reading>, WattlogError> {
        let mut all = self.0.lock().unwrap().clone();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        Ok(all)
    }
}

impl TelemetrySource for FixedTelemetry {
    async fn current_status(&self, _device_id: &str) -> Result<Vec<TelemetryPoint>, WattlogError> {
        Ok(self.0.clone())
    }
}

pub type TestState = AppState<Meters, Readings, FixedTelemetry>;

/// State over empty stores; devices report `add_ele = 1234` (12.34 kWh).
pub fn state(cron_secret: Option<&str>) -> (TestState, Meters, Readings) {
    let meters = Meters::default();
    let readings = Readings::default();
    let telemetry = FixedTelemetry(vec![TelemetryPoint::new("add_ele", 1234)]);
    let state = AppState::new(
        MeterService::new(meters.clone()),
        ReadingService::new(meters.clone(), readings.clone()),
        CollectionJob::new(
            meters.clone(),
            readings.clone(),
            telemetry,
            ProfileRegistry::default(),
            CollectionConfig::default(),
        ),
        cron_secret.map(str::to_owned),
    );
    (state, meters, readings)
}

impl Readings {
    pub fn all(&self) -> Vec<Reading> {
        self.0.lock().unwrap().clone()
    }
}
