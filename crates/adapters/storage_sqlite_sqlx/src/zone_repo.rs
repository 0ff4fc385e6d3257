//! `SQLite` implementation of [`ZoneRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hvac_app::ports::ZoneRepository;
use hvac_domain::error::{HvacError, NotFoundError};
use hvac_domain::id::{SensorId, ZoneId};
use hvac_domain::mode::SystemMode;
use hvac_domain::zone::Zone;

use crate::codec::{self, decode_error};
use crate::error::StorageError;

struct Wrapper(Zone);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let mode: String = row.try_get("mode")?;
        let capabilities: String = row.try_get("capabilities")?;
        let sensor_id: String = row.try_get("sensor_id")?;

        Ok(Self(Zone {
            id: ZoneId::new(id).map_err(decode_error)?,
            label: row.try_get("label")?,
            setpoint: row.try_get("setpoint")?,
            mode: codec::mode(&mode)?,
            capabilities: codec::modes(&capabilities)?,
            sensor_id: SensorId::new(sensor_id).map_err(decode_error)?,
        }))
    }
}

const SELECT_BY_ID: &str = "SELECT * FROM zones WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM zones ORDER BY position";
const UPDATE_MODE: &str = "UPDATE zones SET mode = ? WHERE id = ?";
const UPDATE_SETPOINT: &str = "UPDATE zones SET setpoint = ? WHERE id = ?";

/// `SQLite`-backed zone repository.
pub struct SqliteZoneRepository {
    pool: SqlitePool,
}

impl SqliteZoneRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn not_found(id: &str) -> HvacError {
    NotFoundError {
        entity: "Zone",
        id: id.to_string(),
    }
    .into()
}

impl ZoneRepository for SqliteZoneRepository {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn get_by_id(
        &self,
        id: &ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, HvacError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
                .bind(id)
                .fetch_optional(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(row.map(|w| w.0))
        }
    }

    fn update_mode(
        &self,
        id: &ZoneId,
        mode: SystemMode,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let result = sqlx::query(UPDATE_MODE)
                .bind(mode.as_str())
                .bind(&id)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            if result.rows_affected() == 0 {
                return Err(not_found(&id));
            }
            Ok(())
        }
    }

    fn update_setpoint(
        &self,
        id: &ZoneId,
        setpoint: f64,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        let id = id.to_string();
        async move {
            let result = sqlx::query(UPDATE_SETPOINT)
                .bind(setpoint)
                .bind(&id)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            if result.rows_affected() == 0 {
                return Err(not_found(&id));
            }
            Ok(())
        }
    }
}
