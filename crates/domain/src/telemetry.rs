//! Telemetry points reported by a device and the profiles that decide which
//! of them are meaningful.
//!
//! A vendor reports a flat list of `{code, value}` pairs whose codes differ
//! between device models. A [`TelemetryProfile`] lists the codes a model
//! exposes and how each maps onto a [`ReadingKind`]; the [`ProfileRegistry`]
//! picks a profile per device from configuration instead of hardcoded id lists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::reading::{KWH, ReadingKind};

/// A single status value reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub code: String,
    pub value: serde_json::Value,
}

impl TelemetryPoint {
    pub fn new(code: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

/// How one vendor code maps onto a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMapping {
    pub code: String,
    pub kind: ReadingKind,
    /// Divisor applied to the raw value (energy counters report hundredths).
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub unit: String,
}

fn default_scale() -> f64 {
    1.0
}

impl CodeMapping {
    pub fn new(code: impl Into<String>, kind: ReadingKind, scale: f64, unit: &str) -> Self {
        Self {
            code: code.into(),
            kind,
            scale,
            unit: unit.to_owned(),
        }
    }

    /// Turn a raw vendor value into a scaled number.
    ///
    /// Numbers and numeric strings are divided by `scale`; booleans become
    /// `1.0`/`0.0` unscaled. Anything else yields `None`.
    #[must_use]
    pub fn normalize(&self, raw: &serde_json::Value) -> Option<f64> {
        let value = match raw {
            serde_json::Value::Bool(flag) => return Some(if *flag { 1.0 } else { 0.0 }),
            serde_json::Value::Number(number) => number.as_f64()?,
            serde_json::Value::String(text) => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let scaled = value / scale;
        scaled.is_finite().then_some(scaled)
    }
}

/// A normalized observation ready to be written as a reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub kind: ReadingKind,
    pub value: f64,
    pub unit: String,
}

/// The set of codes recognized for one device model.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryProfile {
    #[serde(default)]
    pub codes: Vec<CodeMapping>,
}

impl TelemetryProfile {
    /// Profile matching the single-phase Tuya energy meters seen in the field.
    #[must_use]
    pub fn energy_meter() -> Self {
        Self {
            codes: vec![
                CodeMapping::new("add_ele", ReadingKind::CumulativeEnergy, 100.0, KWH),
                CodeMapping::new("forward_energy_total", ReadingKind::CumulativeEnergy, 100.0, KWH),
                CodeMapping::new(
                    "reverse_energy_total",
                    ReadingKind::CumulativeEnergyReverse,
                    100.0,
                    KWH,
                ),
                CodeMapping::new("switch", ReadingKind::RelayState, 1.0, ""),
                CodeMapping::new("switch_1", ReadingKind::RelayState, 1.0, ""),
                CodeMapping::new("fault", ReadingKind::Fault, 1.0, ""),
            ],
        }
    }

    /// Look up the mapping for a vendor code.
    #[must_use]
    pub fn mapping(&self, code: &str) -> Option<&CodeMapping> {
        self.codes.iter().find(|mapping| mapping.code == code)
    }

    /// Keep the points this profile recognizes, normalized.
    ///
    /// Unknown codes and unparseable values are dropped. When several codes
    /// map onto the same kind, the first one reported wins so a run never
    /// produces two readings for one `(kind, timestamp)`.
    #[must_use]
    pub fn recognize(&self, points: &[TelemetryPoint]) -> Vec<Observation> {
        let mut observations: Vec<Observation> = Vec::new();
        for point in points {
            let Some(mapping) = self.mapping(&point.code) else {
                continue;
            };
            if observations.iter().any(|obs| obs.kind == mapping.kind) {
                continue;
            }
            if let Some(value) = mapping.normalize(&point.value) {
                observations.push(Observation {
                    kind: mapping.kind,
                    value,
                    unit: mapping.unit.clone(),
                });
            }
        }
        observations
    }
}

/// Chooses a [`TelemetryProfile`] for each device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRegistry {
    /// Profile used for devices without an explicit assignment.
    #[serde(default = "TelemetryProfile::energy_meter")]
    pub default: TelemetryProfile,
    /// Named profiles.
    #[serde(default)]
    pub profiles: HashMap<String, TelemetryProfile>,
    /// Device id → profile name.
    #[serde(default)]
    pub devices: HashMap<String, String>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new(TelemetryProfile::energy_meter())
    }
}

impl ProfileRegistry {
    /// Registry that applies `default` to every device.
    #[must_use]
    pub fn new(default: TelemetryProfile) -> Self {
        Self {
            default,
            profiles: HashMap::new(),
            devices: HashMap::new(),
        }
    }

    /// Register a named profile.
    #[must_use]
    pub fn with_profile(mut self, name: impl Into<String>, profile: TelemetryProfile) -> Self {
        self.profiles.insert(name.into(), profile);
        self
    }

    /// Assign a device to a named profile.
    #[must_use]
    pub fn assign(mut self, device_id: impl Into<String>, profile: impl Into<String>) -> Self {
        self.devices.insert(device_id.into(), profile.into());
        self
    }

    /// The profile for `device_id`, falling back to the default when the
    /// device is unassigned or assigned to an unknown profile name.
    #[must_use]
    pub fn resolve(&self, device_id: &str) -> &TelemetryProfile {
        self.devices
            .get(device_id)
            .and_then(|name| self.profiles.get(name))
            .unwrap_or(&self.default)
    }

    /// Device assignments pointing at profile names that do not exist.
    #[must_use]
    pub fn dangling_assignments(&self) -> Vec<(&str, &str)> {
        let mut dangling: Vec<(&str, &str)> = self
            .devices
            .iter()
            .filter(|(_, name)| !self.profiles.contains_key(name.as_str()))
            .map(|(device, name)| (device.as_str(), name.as_str()))
            .collect();
        dangling.sort_unstable();
        dangling
    }
}
