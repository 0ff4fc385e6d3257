//! `SQLite` implementation of [`DeviceRepository`].
//!
//! All device kinds share one `devices` table; each typed wrapper reads the
//! common columns plus the ones its kind fills.

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hvac_app::ports::DeviceRepository;
use hvac_domain::device::{AirHandler, Boiler, DeviceKind, HeatPump, RadiantFloorLoop};
use hvac_domain::error::{FatalError, HvacError, NotFoundError};
use hvac_domain::id::ZoneId;
use hvac_domain::time::Timestamp;

use crate::codec::{self, decode_error};
use crate::error::StorageError;

/// Wrapper for converting database rows into typed devices.
struct Wrapper<T>(T);

fn missing(column: &str) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: "unexpected NULL".into(),
    }
}

fn zone_id(row: &SqliteRow) -> Result<ZoneId, sqlx::Error> {
    let zone_id: Option<String> = row.try_get("zone_id")?;
    ZoneId::new(zone_id.ok_or_else(|| missing("zone_id"))?).map_err(decode_error)
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper<HeatPump> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let is_primary: Option<bool> = row.try_get("is_primary")?;
        let last_rotated: Option<Timestamp> = row.try_get("last_rotated")?;
        Ok(Self(HeatPump {
            device: codec::device(row)?,
            mode_pin: codec::optional_pin(row, "mode_pin")?.ok_or_else(|| missing("mode_pin"))?,
            is_primary: is_primary.unwrap_or(false),
            last_rotated: last_rotated.ok_or_else(|| missing("last_rotated"))?,
        }))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper<Boiler> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Boiler {
            device: codec::device(row)?,
        }))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper<AirHandler> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(AirHandler {
            device: codec::device(row)?,
            zone_id: zone_id(row)?,
            circ_pump_pin: codec::optional_pin(row, "circ_pump_pin")?
                .ok_or_else(|| missing("circ_pump_pin"))?,
        }))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper<RadiantFloorLoop> {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(RadiantFloorLoop {
            device: codec::device(row)?,
            zone_id: zone_id(row)?,
        }))
    }
}

const SELECT_BY_KIND: &str = "SELECT * FROM devices WHERE kind = ? ORDER BY rowid";
const SWAP_PRIMARY: &str =
    "UPDATE devices SET is_primary = NOT is_primary, last_rotated = ? WHERE kind = 'heat_pump'";
const COUNT_PRIMARY: &str =
    "SELECT COUNT(*) FROM devices WHERE kind = 'heat_pump' AND is_primary = 1";
const UPDATE_LAST_CHANGED: &str = "UPDATE devices SET last_changed = ? WHERE name = ?";
const UPDATE_ONLINE: &str = "UPDATE devices SET online = ? WHERE name = ?";

/// `SQLite`-backed device repository.
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn by_kind<T>(&self, kind: DeviceKind) -> impl Future<Output = Result<Vec<T>, HvacError>> + Send
    where
        T: Send + Unpin + 'static,
        Wrapper<T>: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper<T>> = sqlx::query_as(SELECT_BY_KIND)
                .bind(kind.as_str())
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }
}

fn device_not_found(name: &str) -> HvacError {
    NotFoundError {
        entity: "Device",
        id: name.to_string(),
    }
    .into()
}

impl DeviceRepository for SqliteDeviceRepository {
    fn heat_pumps(&self) -> impl Future<Output = Result<Vec<HeatPump>, HvacError>> + Send {
        self.by_kind(DeviceKind::HeatPump)
    }

    fn boilers(&self) -> impl Future<Output = Result<Vec<Boiler>, HvacError>> + Send {
        self.by_kind(DeviceKind::Boiler)
    }

    fn air_handlers(&self) -> impl Future<Output = Result<Vec<AirHandler>, HvacError>> + Send {
        self.by_kind(DeviceKind::AirHandler)
    }

    fn radiant_loops(
        &self,
    ) -> impl Future<Output = Result<Vec<RadiantFloorLoop>, HvacError>> + Send {
        self.by_kind(DeviceKind::RadiantFloor)
    }

    fn swap_primary_heat_pump(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            sqlx::query(SWAP_PRIMARY)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;

            let (primaries,): (i64,) = sqlx::query_as(COUNT_PRIMARY)
                .fetch_one(&mut *tx)
                .await
                .map_err(StorageError::from)?;
            match primaries {
                // Dropping the transaction rolls the swap back.
                0 => return Err(FatalError::NoPrimaryHeatPump.into()),
                1 => {}
                n => {
                    return Err(FatalError::MultiplePrimaryHeatPumps(
                        usize::try_from(n).unwrap_or(usize::MAX),
                    )
                    .into());
                }
            }

            tx.commit().await.map_err(StorageError::from)?;
            tracing::info!(at = %now, "heat pump roles swapped");
            Ok(())
        }
    }

    fn update_last_changed(
        &self,
        name: &str,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        let name = name.to_string();
        async move {
            let result = sqlx::query(UPDATE_LAST_CHANGED)
                .bind(at)
                .bind(&name)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            if result.rows_affected() == 0 {
                return Err(device_not_found(&name));
            }
            Ok(())
        }
    }

    fn set_online(
        &self,
        name: &str,
        online: bool,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        let name = name.to_string();
        async move {
            let result = sqlx::query(UPDATE_ONLINE)
                .bind(online)
                .bind(&name)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            if result.rows_affected() == 0 {
                return Err(device_not_found(&name));
            }
            Ok(())
        }
    }
}
