//! # wattlog-adapter-tuya
//!
//! Telemetry adapter for the Tuya cloud `OpenAPI`.
//!
//! ## Responsibilities
//! - Sign every request with HMAC-SHA256 the way the platform expects
//! - Acquire an access token and reuse it until shortly before it expires
//! - Unwrap the `{ success, result, code, msg }` response envelope
//! - Implement [`TelemetrySource`](wattlog_app::ports::TelemetrySource) on top of
//!   `GET /v1.0/devices/{id}/status`
//!
//! ## Dependency rule
//! Depends on `wattlog-app` (for the port trait) and `wattlog-domain`.
//! The `app` and `domain` crates must never reference this adapter.

mod client;
mod config;
mod error;
mod response;
mod sign;

pub use client::TuyaClient;
pub use config::{DEFAULT_ENDPOINT, TuyaConfig};
pub use error::TuyaError;
