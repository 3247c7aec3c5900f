//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`WattlogError`]
//! at port boundaries.

use crate::reading::ReadingKind;

/// Top-level error shared by every port and service.
#[derive(Debug, thiserror::Error)]
pub enum WattlogError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A reading with the same `(meter, kind, timestamp)` key already exists.
    #[error("duplicate reading")]
    Duplicate(#[from] DuplicateReadingError),

    /// The persistence layer failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The telemetry source failed or timed out.
    #[error("telemetry error")]
    Telemetry(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A name field was empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An unknown reading kind tag was supplied.
    #[error("unknown reading kind: {0}")]
    UnknownKind(String),

    /// A reading value was not a finite number.
    #[error("reading value must be a finite number")]
    NonFiniteValue,

    /// Derived kinds are written by the derivation engine only.
    #[error("{0} readings are computed from counters and cannot be recorded manually")]
    DerivedKind(ReadingKind),

    /// A cumulative counter sample was below zero.
    #[error("{0} counter value must not be negative")]
    NegativeCounter(ReadingKind),

    /// The range end precedes its start.
    #[error("range end must not precede its start")]
    InvertedRange,

    /// A derivation was requested with a kind pair that does not belong together.
    #[error("{derived} cannot be derived from {cumulative}")]
    MismatchedKinds {
        /// The cumulative kind supplied.
        cumulative: ReadingKind,
        /// The derived kind supplied.
        derived: ReadingKind,
    },
}

/// A lookup by id found nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record looked up (e.g. `"Meter"`).
    pub entity: &'static str,
    /// Identifier that was looked up.
    pub id: String,
}

/// An insert collided with an existing `(meter, kind, timestamp)` reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a {kind} reading already exists for meter {meter_id} at {timestamp}")]
pub struct DuplicateReadingError {
    pub meter_id: String,
    pub kind: ReadingKind,
    pub timestamp: String,
}
