//! # wattlog-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `MeterRepository` — the meter registry
//!   - `ReadingRepository` — the append-only reading store
//!   - `TelemetrySource` — current device status from the vendor platform
//! - Define **driving/inbound ports** as use-case structs:
//!   - `DerivationEngine` — turn a cumulative counter sample into a delta record
//!   - `CollectionJob` — one sweep over every active meter
//!   - `MeterService` — register, update, list, get, delete
//!   - `ReadingService` — query readings, record manual readings, summarize consumption
//!
//! ## Dependency rule
//! Depends on `wattlog-domain` only (plus `tokio::time` for fetch timeouts).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod collection;
pub mod derivation;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod fakes;
