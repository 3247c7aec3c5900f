//! Reading service — read access to the time series plus manual entries.

use serde::Serialize;
use wattlog_domain::error::{NotFoundError, ValidationError, WattlogError};
use wattlog_domain::id::MeterId;
use wattlog_domain::reading::{KWH, Reading, ReadingKind};
use wattlog_domain::time::{Timestamp, now};

use crate::ports::{MeterRepository, ReadingRepository};

/// Largest page a single listing returns.
pub const MAX_LIMIT: usize = 1000;

/// Filter for [`ReadingService::list_for_meter`]. Bounds are inclusive.
#[derive(Debug, Clone)]
pub struct ReadingQuery {
    pub kind: Option<ReadingKind>,
    pub from: Timestamp,
    pub to: Timestamp,
    pub limit: usize,
}

/// A reading entered by hand rather than collected.
#[derive(Debug, Clone)]
pub struct ManualReading {
    pub kind: ReadingKind,
    pub value: f64,
    /// Defaults from the kind when absent.
    pub unit: Option<String>,
    /// Defaults to now. Kept as given, not truncated to the hour.
    pub timestamp: Option<Timestamp>,
}

impl ManualReading {
    /// A power sample in watts taken now.
    #[must_use]
    pub fn power(value: f64) -> Self {
        Self {
            kind: ReadingKind::Power,
            value,
            unit: None,
            timestamp: None,
        }
    }
}

/// Result of [`ReadingService::record_manual`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub reading: Reading,
    /// `false` when an identical key was already stored and `reading` is the
    /// stored one.
    pub created: bool,
}

/// Totals of derived readings for one meter over a range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionSummary {
    pub meter_id: MeterId,
    pub from: Timestamp,
    pub to: Timestamp,
    pub consumption_kwh: f64,
    pub injection_kwh: f64,
    /// Consumption minus injection.
    pub net_kwh: f64,
    /// Number of hours with recorded consumption.
    pub consumption_periods: usize,
    pub injection_periods: usize,
}

fn default_unit(kind: ReadingKind) -> &'static str {
    match kind {
        ReadingKind::Power => "W",
        ReadingKind::CumulativeEnergy
        | ReadingKind::CumulativeEnergyReverse
        | ReadingKind::DerivedConsumption
        | ReadingKind::DerivedInjection => KWH,
        ReadingKind::OnlineStatus | ReadingKind::RelayState | ReadingKind::Fault => "",
    }
}

fn check_range(from: Timestamp, to: Timestamp) -> Result<(), WattlogError> {
    if to < from {
        return Err(ValidationError::InvertedRange.into());
    }
    Ok(())
}

/// Application service for reading queries and manual entries.
pub struct ReadingService<MR, RR> {
    meters: MR,
    readings: RR,
}

impl<MR: MeterRepository, RR: ReadingRepository> ReadingService<MR, RR> {
    /// Create a new service backed by the given repositories.
    pub fn new(meters: MR, readings: RR) -> Self {
        Self { meters, readings }
    }

    async fn require_meter(&self, id: MeterId) -> Result<(), WattlogError> {
        match self.meters.get_by_id(id).await? {
            Some(_) => Ok(()),
            None => Err(NotFoundError {
                entity: "Meter",
                id: id.to_string(),
            }
            .into()),
        }
    }

    /// List a meter's readings in range, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] for an unknown meter,
    /// [`WattlogError::Validation`] for an inverted range, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_meter(
        &self,
        meter_id: MeterId,
        query: ReadingQuery,
    ) -> Result<Vec<Reading>, WattlogError> {
        check_range(query.from, query.to)?;
        self.require_meter(meter_id).await?;
        self.readings
            .find_by_meter_in_range(
                meter_id,
                query.kind,
                query.from,
                query.to,
                Some(query.limit.min(MAX_LIMIT)),
            )
            .await
    }

    /// Latest readings across all meters.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Reading>, WattlogError> {
        self.readings.get_recent(limit.min(MAX_LIMIT)).await
    }

    /// Store a manual reading and mark the meter as recently read.
    ///
    /// Writing the same `(meter, kind, timestamp)` twice keeps the first
    /// value.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] for a derived kind, a negative
    /// counter or a non-finite value, [`WattlogError::NotFound`] for an
    /// unknown meter, or a storage error.
    #[tracing::instrument(skip(self, manual), fields(kind = %manual.kind))]
    pub async fn record_manual(
        &self,
        meter_id: MeterId,
        manual: ManualReading,
    ) -> Result<Recorded, WattlogError> {
        if manual.kind.is_derived() {
            return Err(ValidationError::DerivedKind(manual.kind).into());
        }
        if manual.kind.is_cumulative() && manual.value < 0.0 {
            return Err(ValidationError::NegativeCounter(manual.kind).into());
        }
        self.require_meter(meter_id).await?;
        let unit = manual
            .unit
            .unwrap_or_else(|| default_unit(manual.kind).to_owned());
        let reading = Reading::builder()
            .meter_id(meter_id)
            .kind(manual.kind)
            .value(manual.value)
            .unit(unit)
            .timestamp(manual.timestamp.unwrap_or_else(now))
            .build()?;

        if let Some(existing) = self
            .readings
            .find_exact(meter_id, reading.kind, reading.timestamp)
            .await?
        {
            return Ok(Recorded {
                reading: existing,
                created: false,
            });
        }
        let (reading, created) = match self.readings.insert(reading.clone()).await {
            Ok(stored) => (stored, true),
            Err(WattlogError::Duplicate(_)) => {
                let stored = self
                    .readings
                    .find_exact(meter_id, reading.kind, reading.timestamp)
                    .await?
                    .unwrap_or(reading);
                (stored, false)
            }
            Err(err) => return Err(err),
        };
        self.meters.touch_last_reading(meter_id, now()).await?;
        Ok(Recorded { reading, created })
    }

    /// Sum derived consumption and injection over `[from, to]`.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::NotFound`] for an unknown meter,
    /// [`WattlogError::Validation`] for an inverted range, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn consumption_summary(
        &self,
        meter_id: MeterId,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<ConsumptionSummary, WattlogError> {
        check_range(from, to)?;
        self.require_meter(meter_id).await?;
        let consumption = self
            .readings
            .find_by_meter_in_range(meter_id, Some(ReadingKind::DerivedConsumption), from, to, None)
            .await?;
        let injection = self
            .readings
            .find_by_meter_in_range(meter_id, Some(ReadingKind::DerivedInjection), from, to, None)
            .await?;

        let consumption_kwh: f64 = consumption.iter().map(|r| r.value).sum();
        let injection_kwh: f64 = injection.iter().map(|r| r.value).sum();
        Ok(ConsumptionSummary {
            meter_id,
            from,
            to,
            consumption_kwh,
            injection_kwh,
            net_kwh: consumption_kwh - injection_kwh,
            consumption_periods: consumption.len(),
            injection_periods: injection.len(),
        })
    }
}
