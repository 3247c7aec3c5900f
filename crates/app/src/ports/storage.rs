//! Storage port — repository traits for persistence.

use std::future::Future;

use wattlog_domain::error::WattlogError;
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::time::Timestamp;

/// The meter registry.
pub trait MeterRepository: Send + Sync {
    /// Create a new meter in storage.
    fn create(&self, meter: Meter) -> impl Future<Output = Result<Meter, WattlogError>> + Send;

    /// Get a meter by its unique identifier.
    fn get_by_id(
        &self,
        id: MeterId,
    ) -> impl Future<Output = Result<Option<Meter>, WattlogError>> + Send;

    /// Get all meters, ordered by name.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Meter>, WattlogError>> + Send;

    /// Get the meters flagged active, ordered by name.
    fn get_active(&self) -> impl Future<Output = Result<Vec<Meter>, WattlogError>> + Send;

    /// Update an existing meter.
    fn update(&self, meter: Meter) -> impl Future<Output = Result<Meter, WattlogError>> + Send;

    /// Delete a meter (and its readings) by its unique identifier.
    fn delete(&self, id: MeterId) -> impl Future<Output = Result<(), WattlogError>> + Send;

    /// Record that a collection pass for `id` finished at `at`.
    fn touch_last_reading(
        &self,
        id: MeterId,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), WattlogError>> + Send;
}

/// The append-only reading store.
///
/// Readings are unique per `(meter_id, kind, timestamp)`. Nothing in the
/// application updates or deletes a stored reading.
pub trait ReadingRepository: Send + Sync {
    /// Append a reading.
    ///
    /// Returns [`WattlogError::Duplicate`] when a reading with the same
    /// `(meter_id, kind, timestamp)` key is already stored.
    fn insert(&self, reading: Reading)
    -> impl Future<Output = Result<Reading, WattlogError>> + Send;

    /// The reading stored under exactly this key, if any.
    fn find_exact(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        timestamp: Timestamp,
    ) -> impl Future<Output = Result<Option<Reading>, WattlogError>> + Send;

    /// The newest reading of `kind` for `meter_id` strictly before `before`.
    fn find_latest_before(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        before: Timestamp,
    ) -> impl Future<Output = Result<Option<Reading>, WattlogError>> + Send;

    /// Readings of a meter within `[from, to]`, newest first, optionally
    /// restricted to one kind.
    fn find_by_meter_in_range(
        &self,
        meter_id: MeterId,
        kind: Option<ReadingKind>,
        from: Timestamp,
        to: Timestamp,
        limit: Option<usize>,
    ) -> impl Future<Output = Result<Vec<Reading>, WattlogError>> + Send;

    /// The most recent readings across every meter, newest first.
    fn get_recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Reading>, WattlogError>> + Send;

    /// Insert `reading` unless its key is already taken.
    ///
    /// Returns `true` when a row was written. A lost race against a
    /// concurrent writer is reported as `false`, not as an error.
    fn insert_if_absent(
        &self,
        reading: Reading,
    ) -> impl Future<Output = Result<bool, WattlogError>> + Send {
        async move {
            if self
                .find_exact(reading.meter_id, reading.kind, reading.timestamp)
                .await?
                .is_some()
            {
                return Ok(false);
            }
            match self.insert(reading).await {
                Ok(_) => Ok(true),
                Err(WattlogError::Duplicate(_)) => Ok(false),
                Err(err) => Err(err),
            }
        }
    }
}
