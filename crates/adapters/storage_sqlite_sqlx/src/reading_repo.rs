//! `SQLite` implementation of [`ReadingRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wattlog_app::ports::ReadingRepository;
use wattlog_domain::error::{DuplicateReadingError, WattlogError};
use wattlog_domain::id::{MeterId, ReadingId};
use wattlog_domain::reading::{Reading, ReadingKind};
use wattlog_domain::time::Timestamp;

use crate::error::StorageError;
use crate::{decode_timestamp, encode_timestamp};

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Wrapper(Reading);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let meter_id: String = row.try_get("meter_id")?;
        let kind: String = row.try_get("kind")?;
        let timestamp: String = row.try_get("timestamp")?;

        let id = ReadingId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let meter_id =
            MeterId::from_str(&meter_id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let kind =
            ReadingKind::from_str(&kind).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Reading {
            id,
            meter_id,
            kind,
            value: row.try_get("value")?,
            unit: row.try_get("unit")?,
            timestamp: decode_timestamp(&timestamp)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO readings (id, meter_id, kind, value, unit, timestamp)
    VALUES (?, ?, ?, ?, ?, ?)
";

const SELECT_EXACT: &str = r"
    SELECT * FROM readings
    WHERE meter_id = ? AND kind = ? AND timestamp = ?
";

const SELECT_LATEST_BEFORE: &str = r"
    SELECT * FROM readings
    WHERE meter_id = ? AND kind = ? AND timestamp < ?
    ORDER BY timestamp DESC
    LIMIT 1
";

// `?2 IS NULL` disables the kind filter; a negative LIMIT means no limit.
const SELECT_BY_METER_IN_RANGE: &str = r"
    SELECT * FROM readings
    WHERE meter_id = ?1
      AND (?2 IS NULL OR kind = ?2)
      AND timestamp >= ?3 AND timestamp <= ?4
    ORDER BY timestamp DESC, kind
    LIMIT ?5
";

const SELECT_RECENT: &str = r"
    SELECT * FROM readings
    ORDER BY timestamp DESC, meter_id, kind
    LIMIT ?
";

fn limit_param(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// `SQLite`-backed reading store.
#[derive(Clone)]
pub struct SqliteReadingRepository {
    pool: SqlitePool,
}

impl SqliteReadingRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ReadingRepository for SqliteReadingRepository {
    async fn insert(&self, reading: Reading) -> Result<Reading, WattlogError> {
        let result = sqlx::query(INSERT)
            .bind(reading.id.to_string())
            .bind(reading.meter_id.to_string())
            .bind(reading.kind.as_str())
            .bind(reading.value)
            .bind(&reading.unit)
            .bind(encode_timestamp(reading.timestamp))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(reading),
            Err(err) if is_unique_violation(&err) => Err(DuplicateReadingError {
                meter_id: reading.meter_id.to_string(),
                kind: reading.kind,
                timestamp: reading.timestamp.to_rfc3339(),
            }
            .into()),
            Err(err) => Err(StorageError::from(err).into()),
        }
    }

    async fn find_exact(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        timestamp: Timestamp,
    ) -> Result<Option<Reading>, WattlogError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_EXACT)
            .bind(meter_id.to_string())
            .bind(kind.as_str())
            .bind(encode_timestamp(timestamp))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn find_latest_before(
        &self,
        meter_id: MeterId,
        kind: ReadingKind,
        before: Timestamp,
    ) -> Result<Option<Reading>, WattlogError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_LATEST_BEFORE)
            .bind(meter_id.to_string())
            .bind(kind.as_str())
            .bind(encode_timestamp(before))
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(|w| w.0))
    }

    async fn find_by_meter_in_range(
        &self,
        meter_id: MeterId,
        kind: Option<ReadingKind>,
        from: Timestamp,
        to: Timestamp,
        limit: Option<usize>,
    ) -> Result<Vec<Reading>, WattlogError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_METER_IN_RANGE)
            .bind(meter_id.to_string())
            .bind(kind.map(ReadingKind::as_str))
            .bind(encode_timestamp(from))
            .bind(encode_timestamp(to))
            .bind(limit_param(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn get_recent(&self, limit: usize) -> Result<Vec<Reading>, WattlogError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_RECENT)
            .bind(limit_param(Some(limit)))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
