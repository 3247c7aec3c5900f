//! Meter — a registry entry pointing at a vendor-side smart-meter device.

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WattlogError};
use crate::id::MeterId;
use crate::time::Timestamp;

/// A smart meter known to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub id: MeterId,
    pub name: String,
    pub location: Option<String>,
    /// Identifier of the device on the telemetry platform.
    pub device_id: Option<String>,
    /// Inactive meters are skipped by collection runs.
    pub active: bool,
    /// When the last successful collection pass for this meter finished.
    pub last_reading_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl Meter {
    /// Create a builder for constructing a [`Meter`].
    #[must_use]
    pub fn builder() -> MeterBuilder {
        MeterBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] when `name` is blank.
    pub fn validate(&self) -> Result<(), WattlogError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// The vendor device id, ignoring blank values.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.device_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Step-by-step builder for [`Meter`].
#[derive(Debug)]
pub struct MeterBuilder {
    id: Option<MeterId>,
    name: Option<String>,
    location: Option<String>,
    device_id: Option<String>,
    active: bool,
    last_reading_at: Option<Timestamp>,
    created_at: Option<Timestamp>,
}

impl Default for MeterBuilder {
    fn default() -> Self {
        Self {
            id: None,
            name: None,
            location: None,
            device_id: None,
            active: true,
            last_reading_at: None,
            created_at: None,
        }
    }
}

impl MeterBuilder {
    #[must_use]
    pub fn id(mut self, id: MeterId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    #[must_use]
    pub fn last_reading_at(mut self, ts: Timestamp) -> Self {
        self.last_reading_at = Some(ts);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Meter`].
    ///
    /// # Errors
    ///
    /// Returns [`WattlogError::Validation`] if `name` is missing or blank.
    pub fn build(self) -> Result<Meter, WattlogError> {
        let meter = Meter {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            location: self.location,
            device_id: self.device_id,
            active: self.active,
            last_reading_at: self.last_reading_at,
            created_at: self.created_at.unwrap_or_else(crate::time::now),
        };
        meter.validate()?;
        Ok(meter)
    }
}
