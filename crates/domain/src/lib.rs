//! # wattlog-domain
//!
//! Pure domain model for the wattlog energy monitor.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Meters** (registry entries pointing at a vendor device)
//! - Define **Readings** (immutable timestamped observations) and their kinds
//! - Define **Telemetry** points and the code profiles that map vendor codes
//!   to reading kinds
//! - Classify consecutive cumulative counter samples (increase, no change, reset)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod delta;
pub mod meter;
pub mod reading;
pub mod telemetry;
