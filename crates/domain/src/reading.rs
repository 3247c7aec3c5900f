//! Reading — an immutable, timestamped observation belonging to a meter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WattlogError};
use crate::id::{MeterId, ReadingId};
use crate::time::Timestamp;

/// Unit label written on energy readings.
pub const KWH: &str = "kWh";

/// What a reading's value measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    /// Total imported energy since the counter's last reset (kWh).
    CumulativeEnergy,
    /// Total exported energy since the counter's last reset (kWh).
    CumulativeEnergyReverse,
    /// `1.0` when the device answered the last poll, `0.0` otherwise.
    OnlineStatus,
    /// Imported energy during one sampling interval (kWh).
    DerivedConsumption,
    /// Exported energy during one sampling interval (kWh).
    DerivedInjection,
    /// Relay position, `1.0` closed.
    RelayState,
    /// Device fault flag or bitmap.
    Fault,
    /// Instantaneous power (W), mostly from manual submissions.
    Power,
}

impl ReadingKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::CumulativeEnergy,
        Self::CumulativeEnergyReverse,
        Self::OnlineStatus,
        Self::DerivedConsumption,
        Self::DerivedInjection,
        Self::RelayState,
        Self::Fault,
        Self::Power,
    ];

    /// The stable tag used in storage and over the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CumulativeEnergy => "cumulative_energy",
            Self::CumulativeEnergyReverse => "cumulative_energy_reverse",
            Self::OnlineStatus => "online_status",
            Self::DerivedConsumption => "derived_consumption",
            Self::DerivedInjection => "derived_injection",
            Self::RelayState => "relay_state",
            Self::Fault => "fault",
            Self::Power => "power",
        }
    }

    /// Whether this kind is a monotonically increasing counter.
    #[must_use]
    pub fn is_cumulative(self) -> bool {
        matches!(self, Self::CumulativeEnergy | Self::CumulativeEnergyReverse)
    }

    /// Whether this kind is only ever computed from a cumulative counter.
    #[must_use]
    pub fn is_derived(self) -> bool {
        matches!(self, Self::DerivedConsumption | Self::DerivedInjection)
    }

    /// The per-interval kind computed from this cumulative kind, if any.
    #[must_use]
    pub fn derived_counterpart(self) -> Option<Self> {
        match self {
            Self::CumulativeEnergy => Some(Self::DerivedConsumption),
            Self::CumulativeEnergyReverse => Some(Self::DerivedInjection),
            _ => None,
        }
    }
}

impl fmt::Display for ReadingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownKind(s.to_owned()))
    }
}

/// A single stored observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: ReadingId,
    pub meter_id: MeterId,
    pub kind: ReadingKind,
    pub value: f64,
    pub unit: String,
    pub timestamp: Timestamp,
}

impl Reading {
    /// Create a builder for constructing a [`Reading`].
    #[must_use]
    pub fn builder() -> ReadingBuilder {
        ReadingBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] when `value` is NaN or infinite.
    pub fn validate(&self) -> Result<(), WattlogError> {
        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Reading`].
#[derive(Debug, Default)]
pub struct ReadingBuilder {
    id: Option<ReadingId>,
    meter_id: Option<MeterId>,
    kind: Option<ReadingKind>,
    value: f64,
    unit: Option<String>,
    timestamp: Option<Timestamp>,
}

impl ReadingBuilder {
    #[must_use]
    pub fn id(mut self, id: ReadingId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn meter_id(mut self, meter_id: MeterId) -> Self {
        self.meter_id = Some(meter_id);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: ReadingKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Consume the builder, validate, and return a [`Reading`].
    ///
    /// Kind defaults to [`ReadingKind::CumulativeEnergy`], the timestamp to now.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] if the value is not finite.
    pub fn build(self) -> Result<Reading, WattlogError> {
        let reading = Reading {
            id: self.id.unwrap_or_default(),
            meter_id: self.meter_id.unwrap_or_default(),
            kind: self.kind.unwrap_or(ReadingKind::CumulativeEnergy),
            value: self.value,
            unit: self.unit.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_else(crate::time::now),
        };
        reading.validate()?;
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_every_kind_through_display_and_from_str() {
        for kind in ReadingKind::ALL {
            let parsed: ReadingKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn should_serialize_kind_as_snake_case_tag() {
        let json = serde_json::to_string(&ReadingKind::CumulativeEnergyReverse).unwrap();
        assert_eq!(json, "\"cumulative_energy_reverse\"");
    }

    #[test]
    fn should_reject_unknown_kind_tag() {
        let result = ReadingKind::from_str("energy_total");
        assert_eq!(
            result,
            Err(ValidationError::UnknownKind("energy_total".to_string()))
        );
    }

    #[test]
    fn should_pair_cumulative_kinds_with_their_derived_kind() {
        assert_eq!(
            ReadingKind::CumulativeEnergy.derived_counterpart(),
            Some(ReadingKind::DerivedConsumption)
        );
        assert_eq!(
            ReadingKind::CumulativeEnergyReverse.derived_counterpart(),
            Some(ReadingKind::DerivedInjection)
        );
        assert_eq!(ReadingKind::OnlineStatus.derived_counterpart(), None);
        assert!(!ReadingKind::DerivedConsumption.is_cumulative());
    }

    #[test]
    fn should_build_reading_with_all_fields() {
        let meter_id = MeterId::new();
        let ts = crate::time::now();
        let reading = Reading::builder()
            .meter_id(meter_id)
            .kind(ReadingKind::DerivedConsumption)
            .value(3.5)
            .unit(KWH)
            .timestamp(ts)
            .build()
            .unwrap();

        assert_eq!(reading.meter_id, meter_id);
        assert_eq!(reading.kind, ReadingKind::DerivedConsumption);
        assert!((reading.value - 3.5).abs() < f64::EPSILON);
        assert_eq!(reading.unit, "kWh");
        assert_eq!(reading.timestamp, ts);
    }

    #[test]
    fn should_reject_nan_value() {
        let result = Reading::builder().value(f64::NAN).build();
        assert!(matches!(
            result,
            Err(WattlogError::Validation(ValidationError::NonFiniteValue))
        ));
    }
}
