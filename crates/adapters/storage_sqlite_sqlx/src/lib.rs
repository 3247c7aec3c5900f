//! # wattlog-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `wattlog-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC so that string
//! comparison in SQL matches chronological order.
//!
//! ## Dependency rule
//! Depends on `wattlog-app` (for port traits) and `wattlog-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;
mod meter_repo;
mod pool;
mod reading_repo;

pub use error::StorageError;
pub use meter_repo::SqliteMeterRepository;
pub use pool::{Config, Database};
pub use reading_repo::SqliteReadingRepository;

use chrono::SecondsFormat;
use wattlog_domain::time::Timestamp;

fn encode_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(raw: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}
