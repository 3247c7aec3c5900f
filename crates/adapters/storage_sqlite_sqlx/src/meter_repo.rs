//! `SQLite` implementation of [`MeterRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wattlog_app::ports::MeterRepository;
use wattlog_domain::error::WattlogError;
use wattlog_domain::id::MeterId;
use wattlog_domain::meter::Meter;
use wattlog_domain::time::Timestamp;

use crate::error::StorageError;
use crate::{decode_timestamp, encode_timestamp};

/// Wrapper for converting database rows into domain [`Meter`].
struct Wrapper(Meter);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Meter> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let last_reading_at: Option<String> = row.try_get("last_reading_at")?;
        let created_at: String = row.try_get("created_at")?;

        let id = MeterId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let last_reading_at = last_reading_at
            .as_deref()
            .map(decode_timestamp)
            .transpose()?;

        Ok(Self(Meter {
            id,
            name: row.try_get("name")?,
            location: row.try_get("location")?,
            device_id: row.try_get("device_id")?,
            active: row.try_get("active")?,
            last_reading_at,
            created_at: decode_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO meters (id, name, location, device_id, active, last_reading_at, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?)
";
const SELECT_BY_ID: &str = "SELECT * FROM meters WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM meters ORDER BY name, id";
const SELECT_ACTIVE: &str = "SELECT * FROM meters WHERE active = 1 ORDER BY name, id";
const UPDATE: &str =
    "UPDATE meters SET name = ?, location = ?, device_id = ?, active = ? WHERE id = ?";
const TOUCH: &str = "UPDATE meters SET last_reading_at = ? WHERE id = ?";
const DELETE_BY_ID: &str = "DELETE FROM meters WHERE id = ?";

/// `SQLite`-backed meter registry.
#[derive(Clone)]
pub struct SqliteMeterRepository {
    pool: SqlitePool,
}

impl SqliteMeterRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn list(&self, query: &'static str) -> Result<Vec<Meter>, WattlogError> {
        let rows: Vec<Wrapper> = sqlx::query_as(query)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl MeterRepository for SqliteMeterRepository {
    async fn create(&self, meter: Meter) -> Result<Meter, WattlogError> {
        sqlx::query(INSERT)
            .bind(meter.id.to_string())
            .bind(&meter.name)
            .bind(&meter.location)
            .bind(&meter.device_id)
            .bind(meter.active)
            .bind(meter.last_reading_at.map(encode_timestamp))
            .bind(encode_timestamp(meter.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(meter)
    }

    async fn get_by_id(&self, id: MeterId) -> Result<Option<Meter>, WattlogError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Meter>, WattlogError> {
        self.list(SELECT_ALL).await
    }

    async fn get_active(&self) -> Result<Vec<Meter>, WattlogError> {
        self.list(SELECT_ACTIVE).await
    }

    async fn update(&self, meter: Meter) -> Result<Meter, WattlogError> {
        sqlx::query(UPDATE)
            .bind(&meter.name)
            .bind(&meter.location)
            .bind(&meter.device_id)
            .bind(meter.active)
            .bind(meter.id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(meter)
    }

    async fn delete(&self, id: MeterId) -> Result<(), WattlogError> {
        sqlx::query(DELETE_BY_ID)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }

    async fn touch_last_reading(&self, id: MeterId, at: Timestamp) -> Result<(), WattlogError> {
        sqlx::query(TOUCH)
            .bind(encode_timestamp(at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(())
    }
}
