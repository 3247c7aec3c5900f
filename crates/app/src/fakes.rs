//! In-memory port implementations shared by the unit tests of this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use wattlog_domain::error::{DuplicateReadingError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::telemetry::TelemetryPoint;
use wattlog_domain::time::Timestamp;

use crate::ports::{MeterRepository, ReadingRepository, TelemetrySource};

pub fn storage_failure(message: &str) -> WattlogError {
    WattlogError::Storage(Box::new(std::io::Error::other(message.to_owned())))
}

#[derive(Default)]
pub struct InMemoryMeterRepo {
    pub store: Mutex<HashMap<MeterId, Meter>>,
    pub unavailable: AtomicBool,
}

impl InMemoryMeterRepo {
    pub fn with(meters: impl IntoIterator<Item = Meter>) -> Self {
        let repo = Self::default();
        {
            let mut store = repo.store.lock().unwrap();
            for meter in meters {
                store.insert(meter.id, meter);
            }
        }
        repo
    }

    pub fn get(&self, id: MeterId) -> Option<Meter> {
        self.store.lock().unwrap().get(&id).cloned()
    }

    fn sorted(&self, filter: impl Fn(&Meter) -> bool) -> Result<Vec<Meter>, WattlogError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(storage_failure("registry unreachable"));
        }
        let store = self.store.lock().unwrap();
        let mut meters: Vec<Meter> = store.values().filter(|m| filter(m)).cloned().collect();
        meters.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(meters)
    }
}

impl MeterRepository for InMemoryMeterRepo {
    async fn create(&self, meter: Meter) -> Result<Meter, WattlogError> {
        self.store.lock().unwrap().insert(meter.id, meter.clone());
        Ok(meter)
    }

    async fn get_by_id(&self, id: MeterId) -> Result<Option<Meter>, WattlogError> {
        Ok(self.get(id))
    }

    async fn get_all(&self) -> Result<Vec<Meter>, WattlogError> {
        self.sorted(|_| true)
    }

    async fn get_active(&self) -> Result<Vec<Meter>, WattlogError> {
        self.sorted(|m| m.active)
    }

    async fn update(&self, meter: Meter) -> Result<Meter, WattlogError> {
        self.store.lock().unwrap().insert(meter.id, meter.clone());
        Ok(meter)
    }

    async fn delete(&self, id: MeterId) -> Result<(), WattlogError> {
        self.store.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn touch_last_reading(&self, id: MeterId, at: Timestamp) -> Result<(), WattlogError> {
        if let Some(meter) = self.store.lock().unwrap().get_mut(&id) {
            meter.last_reading_at = Some(at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReadingRepo {
    pub store: Mutex<Vec<Reading>>,
    /// Inserts for this meter fail with a storage error.
    pub failing_meter: Mutex<Option<MeterId>>,
    /// Lookups by exact key pretend nothing is there, simulating a
    /// concurrent writer winning the race between check and insert.
    pub blind_exact_lookup: AtomicBool,
}

impl InMemoryReadingRepo {
    pub fn with(readings: impl IntoIterator<Item = Reading>) -> Self {
        let repo = Self::default();
        repo.store.lock().unwrap().extend(readings);
        repo
    }

    pub fn of_kind(&self, meter_id: MeterId, kind: ReadingKind) -> Vec<Reading> {
        let mut found: Vec<Reading> = self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.meter_id == meter_id && r.kind == kind)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.timestamp);
        found
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

impl ReadingRepository for InMemoryReadingRepo {
    async fn insert(&self, reading: Reading) -> Result<Reading, WattlogError> {
        if *self.failing_meter.lock().unwrap() == Some(reading.meter_id) {
            return Err(storage_failure("disk full"));
        }
        let mut store = self.store.lock().unwrap();
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
        if self.blind_exact_lookup.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .store
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
            .store
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
            .store
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
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<Reading>, WattlogError> {
        let mut all = self.store.lock().unwrap().clone();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        Ok(all)
    }
}

/// Telemetry stub answering from a fixed table.
#[derive(Default)]
pub struct StubTelemetry {
    pub statuses: HashMap<String, Vec<TelemetryPoint>>,
    pub failing: Vec<String>,
    pub slow: Vec<String>,
}

impl StubTelemetry {
    pub fn status(mut self, device_id: &str, points: Vec<TelemetryPoint>) -> Self {
        self.statuses.insert(device_id.to_owned(), points);
        self
    }

    pub fn failing(mut self, device_id: &str) -> Self {
        self.failing.push(device_id.to_owned());
        self
    }

    pub fn slow(mut self, device_id: &str) -> Self {
        self.slow.push(device_id.to_owned());
        self
    }
}

impl TelemetrySource for StubTelemetry {
    async fn current_status(&self, device_id: &str) -> Result<Vec<TelemetryPoint>, WattlogError> {
        if self.slow.iter().any(|d| d == device_id) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.iter().any(|d| d == device_id) {
            return Err(WattlogError::Telemetry(Box::new(std::io::Error::other(
                "device offline",
            ))));
        }
        Ok(self.statuses.get(device_id).cloned().unwrap_or_default())
    }
}
