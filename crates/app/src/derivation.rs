//! Consumption derivation engine — turns a freshly observed cumulative
//! counter sample into at most one per-interval delta reading.
//!
//! The engine is stateless: every call reads the previous sample from the
//! [`ReadingRepository`] and writes through it. The same algorithm serves
//! both directions of energy flow:
//!
//! | cumulative kind             | derived kind          |
//! |-----------------------------|-----------------------|
//! | `cumulative_energy`         | `derived_consumption` |
//! | `cumulative_energy_reverse` | `derived_injection`   |

use serde::Serialize;

use wattlog_domain::delta::DeltaClass;
use wattlog_domain::error::{ValidationError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::reading::{KWH, Reading, ReadingKind};
use wattlog_domain::time::Timestamp;

use crate::ports::ReadingRepository;

/// What a single [`DerivationEngine::derive_delta`] call did.
///
/// Only [`Written`](Self::Written) touched the store; every other variant is
/// a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DerivedResult {
    /// A derived reading with this value was stored.
    Written { value: f64 },
    /// No earlier sample of the cumulative kind exists.
    FirstObservation,
    /// The counter did not move since the previous sample.
    NoChange,
    /// A derived reading for this period is already stored.
    DuplicatePeriod,
    /// The counter went backwards by `delta` (< 0).
    ResetDetected { delta: f64 },
}

impl DerivedResult {
    /// Whether a reading was stored.
    #[must_use]
    pub fn written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// Short machine-readable reason for outcomes that wrote nothing.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Written { .. } => None,
            Self::FirstObservation => Some("first-observation"),
            Self::NoChange => Some("no-change"),
            Self::DuplicatePeriod => Some("duplicate-period"),
            Self::ResetDetected { .. } => Some("reset-detected"),
        }
    }
}

/// Derives per-interval consumption and injection from cumulative counters.
pub struct DerivationEngine<R> {
    repo: R,
}

impl<R: ReadingRepository> DerivationEngine<R> {
    /// Create an engine reading from and writing to `repo`.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// The underlying reading store.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Compare `current_value` with the latest earlier `cumulative_kind`
    /// sample and store the positive difference as a `derived_kind` reading
    /// at `timestamp`.
    ///
    /// Performs one latest-before lookup and, only for a positive delta, one
    /// exact lookup plus insert. Never updates or deletes readings.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] if `derived_kind` is not the
    /// counterpart of `cumulative_kind`, and propagates store failures
    /// unchanged. An already stored target reading is not an error.
    #[tracing::instrument(
        skip(self),
        fields(meter_id = %meter_id, kind = %cumulative_kind)
    )]
    pub async fn derive_delta(
        &self,
        meter_id: MeterId,
        cumulative_kind: ReadingKind,
        derived_kind: ReadingKind,
        current_value: f64,
        timestamp: Timestamp,
    ) -> Result<DerivedResult, WattlogError> {
        if cumulative_kind.derived_counterpart() != Some(derived_kind) {
            return Err(ValidationError::MismatchedKinds {
                cumulative: cumulative_kind,
                derived: derived_kind,
            }
            .into());
        }

        let Some(prior) = self
            .repo
            .find_latest_before(meter_id, cumulative_kind, timestamp)
            .await?
        else {
            tracing::debug!("no earlier sample, nothing to derive");
            return Ok(DerivedResult::FirstObservation);
        };

        match DeltaClass::classify(prior.value, current_value) {
            DeltaClass::Unchanged => Ok(DerivedResult::NoChange),
            DeltaClass::Decrease(delta) => {
                tracing::warn!(
                    prior = prior.value,
                    current = current_value,
                    delta,
                    "counter went backwards, probable meter reset"
                );
                Ok(DerivedResult::ResetDetected { delta })
            }
            DeltaClass::Increase(delta) => {
                let reading = Reading::builder()
                    .meter_id(meter_id)
                    .kind(derived_kind)
                    .value(delta)
                    .unit(KWH)
                    .timestamp(timestamp)
                    .build()?;
                if self.repo.insert_if_absent(reading).await? {
                    tracing::debug!(derived = %derived_kind, delta, "derived reading stored");
                    Ok(DerivedResult::Written { value: delta })
                } else {
                    Ok(DerivedResult::DuplicatePeriod)
                }
            }
        }
    }

    /// [`derive_delta`](Self::derive_delta) for imported energy.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn derive_consumption(
        &self,
        meter_id: MeterId,
        current_value: f64,
        timestamp: Timestamp,
    ) -> Result<DerivedResult, WattlogError> {
        self.derive_delta(
            meter_id,
            ReadingKind::CumulativeEnergy,
            ReadingKind::DerivedConsumption,
            current_value,
            timestamp,
        )
        .await
    }

    /// [`derive_delta`](Self::derive_delta) for exported energy.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn derive_injection(
        &self,
        meter_id: MeterId,
        current_value: f64,
        timestamp: Timestamp,
    ) -> Result<DerivedResult, WattlogError> {
        self.derive_delta(
            meter_id,
            ReadingKind::CumulativeEnergyReverse,
            ReadingKind::DerivedInjection,
            current_value,
            timestamp,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::fakes::InMemoryReadingRepo;

    fn t(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2025, 5, 1, hour, 0, 0).unwrap()
    }

    fn cumulative(meter_id: MeterId, kind: ReadingKind, value: f64, at: Timestamp) -> Reading {
        Reading::builder()
            .meter_id(meter_id)
            .kind(kind)
            .value(value)
            .unit(KWH)
            .timestamp(at)
            .build()
            .unwrap()
    }

    fn engine_with(readings: Vec<Reading>) -> DerivationEngine<InMemoryReadingRepo> {
        DerivationEngine::new(InMemoryReadingRepo::with(readings))
    }

    #[tokio::test]
    async fn should_write_positive_delta_as_derived_consumption() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            1500.00,
            t(0),
        )]);

        let result = engine.derive_consumption(meter, 1503.50, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::Written { value: 3.5 });
        let derived = engine
            .repository()
            .of_kind(meter, ReadingKind::DerivedConsumption);
        assert_eq!(derived.len(), 1);
        assert!((derived[0].value - 3.5).abs() < f64::EPSILON);
        assert_eq!(derived[0].timestamp, t(1));
        assert_eq!(derived[0].unit, "kWh");
    }

    #[tokio::test]
    async fn should_report_reset_without_writing_when_counter_drops() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            1503.50,
            t(0),
        )]);

        let result = engine.derive_consumption(meter, 10.00, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::ResetDetected { delta: -1493.5 });
        assert_eq!(result.reason(), Some("reset-detected"));
        assert!(
            engine
                .repository()
                .of_kind(meter, ReadingKind::DerivedConsumption)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn should_report_first_observation_when_no_prior_reverse_reading() {
        let meter = MeterId::new();
        let other = MeterId::new();
        let engine = engine_with(vec![
            cumulative(meter, ReadingKind::CumulativeEnergy, 900.0, t(0)),
            cumulative(other, ReadingKind::CumulativeEnergyReverse, 10.0, t(0)),
        ]);

        let result = engine.derive_injection(meter, 42.00, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::FirstObservation);
        assert_eq!(result.reason(), Some("first-observation"));
        assert!(
            engine
                .repository()
                .of_kind(meter, ReadingKind::DerivedInjection)
                .is_empty()
        );
    }

    #[tokio::test]
    async fn should_report_no_change_when_value_is_equal() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            77.7,
            t(0),
        )]);

        let result = engine.derive_consumption(meter, 77.7, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::NoChange);
        assert!(!result.written());
        assert_eq!(engine.repository().len(), 1);
    }

    #[tokio::test]
    async fn should_ignore_sample_at_same_timestamp_when_finding_prior() {
        let meter = MeterId::new();
        let engine = engine_with(vec![
            cumulative(meter, ReadingKind::CumulativeEnergy, 100.0, t(0)),
            cumulative(meter, ReadingKind::CumulativeEnergy, 105.0, t(1)),
        ]);

        let result = engine.derive_consumption(meter, 105.0, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::Written { value: 5.0 });
    }

    #[tokio::test]
    async fn should_be_idempotent_when_called_twice_with_same_arguments() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            1500.0,
            t(0),
        )]);

        let first = engine.derive_consumption(meter, 1503.5, t(1)).await.unwrap();
        let second = engine.derive_consumption(meter, 1503.5, t(1)).await.unwrap();

        assert!(first.written());
        assert_eq!(second, DerivedResult::DuplicatePeriod);
        assert_eq!(second.reason(), Some("duplicate-period"));
        assert_eq!(
            engine
                .repository()
                .of_kind(meter, ReadingKind::DerivedConsumption)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn should_treat_lost_insert_race_as_duplicate_period() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            10.0,
            t(0),
        )]);
        engine.derive_consumption(meter, 12.0, t(1)).await.unwrap();
        engine
            .repository()
            .blind_exact_lookup
            .store(true, Ordering::SeqCst);

        let result = engine.derive_consumption(meter, 12.0, t(1)).await.unwrap();

        assert_eq!(result, DerivedResult::DuplicatePeriod);
    }

    #[tokio::test]
    async fn should_propagate_store_failure_on_write() {
        let meter = MeterId::new();
        let engine = engine_with(vec![cumulative(
            meter,
            ReadingKind::CumulativeEnergy,
            10.0,
            t(0),
        )]);
        *engine.repository().failing_meter.lock().unwrap() = Some(meter);

        let result = engine.derive_consumption(meter, 11.0, t(1)).await;

        assert!(matches!(result, Err(WattlogError::Storage(_))));
    }

    #[tokio::test]
    async fn should_reject_mismatched_kind_pair() {
        let engine = engine_with(vec![]);

        let result = engine
            .derive_delta(
                MeterId::new(),
                ReadingKind::CumulativeEnergy,
                ReadingKind::DerivedInjection,
                1.0,
                t(1),
            )
            .await;

        assert!(matches!(
            result,
            Err(WattlogError::Validation(
                ValidationError::MismatchedKinds { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn should_keep_forward_and_reverse_histories_separate() {
        let meter = MeterId::new();
        let engine = engine_with(vec![
            cumulative(meter, ReadingKind::CumulativeEnergy, 100.0, t(0)),
            cumulative(meter, ReadingKind::CumulativeEnergyReverse, 50.0, t(0)),
        ]);

        let consumption = engine.derive_consumption(meter, 101.25, t(1)).await.unwrap();
        let injection = engine.derive_injection(meter, 52.5, t(1)).await.unwrap();

        assert_eq!(consumption, DerivedResult::Written { value: 1.25 });
        assert_eq!(injection, DerivedResult::Written { value: 2.5 });
    }

    #[tokio::test]
    async fn should_telescope_sum_of_deltas_to_total_increase() {
        let meter = MeterId::new();
        let engine = engine_with(vec![]);
        let samples = [1000.0, 1000.0, 1002.25, 1010.5, 1010.5, 1011.0, 1020.75];
        let start = t(0);

        for (i, value) in samples.iter().enumerate() {
            let at = start + TimeDelta::hours(i64::try_from(i).unwrap());
            engine
                .repository()
                .insert(cumulative(meter, ReadingKind::CumulativeEnergy, *value, at))
                .await
                .unwrap();
            engine.derive_consumption(meter, *value, at).await.unwrap();
        }

        let total: f64 = engine
            .repository()
            .of_kind(meter, ReadingKind::DerivedConsumption)
            .iter()
            .map(|r| r.value)
            .sum();
        assert!((total - (samples[samples.len() - 1] - samples[0])).abs() < 1e-9);
    }
}
