//! # wattlog-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a JSON API for the meter registry and its readings
//!   (`/api/meters`, `/api/meters/{id}/readings`, `/api/readings`, …)
//! - Expose the collection job behind a bearer secret (`/api/collect`) so an
//!   external scheduler can trigger runs
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map application results and errors into JSON responses
//!
//! ## Dependency rule
//! Depends on `wattlog-app` (for port traits and services) and `wattlog-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;
