//! `SQLite` implementation of [`SystemRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hvac_app::ports::SystemRepository;
use hvac_domain::error::{FatalError, HvacError};
use hvac_domain::mode::SystemMode;
use hvac_domain::system::SystemState;
use hvac_domain::time::Timestamp;

use crate::codec;
use crate::error::StorageError;

/// Wrapper for converting the system row into a domain [`SystemState`].
struct Wrapper(SystemState);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let mode: String = row.try_get("system_mode")?;
        let prior_mode: Option<String> = row.try_get("prior_mode")?;

        Ok(Self(SystemState {
            mode: codec::mode(&mode)?,
            override_active: row.try_get("override_active")?,
            prior_mode: prior_mode.as_deref().map(codec::mode).transpose()?,
            recirculation_active: row.try_get("recirculation_active")?,
            recirculation_started_at: row.try_get("recirculation_started_at")?,
            main_power_pin: codec::pin(row, "main_power_pin")?,
        }))
    }
}

const SELECT: &str = "SELECT * FROM system WHERE id = 1";
const UPDATE_MODE: &str = "UPDATE system SET system_mode = ? WHERE id = 1";
const UPDATE_OVERRIDE: &str =
    "UPDATE system SET system_mode = ?, override_active = ?, prior_mode = ? WHERE id = 1";
const UPDATE_RECIRCULATION: &str =
    "UPDATE system SET recirculation_active = ?, recirculation_started_at = ? WHERE id = 1";

/// `SQLite`-backed system singleton.
pub struct SqliteSystemRepository {
    pool: SqlitePool,
}

impl SqliteSystemRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn fetch<'e, E>(executor: E) -> Result<SystemState, HvacError>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row: Option<Wrapper> = sqlx::query_as(SELECT)
        .fetch_optional(executor)
        .await
        .map_err(StorageError::from)?;
    row.map(|w| w.0).ok_or_else(|| {
        FatalError::StoreUnavailable("system state has not been seeded".to_string()).into()
    })
}

async fn write_override(
    executor: &mut sqlx::SqliteConnection,
    state: &SystemState,
) -> Result<(), HvacError> {
    sqlx::query(UPDATE_OVERRIDE)
        .bind(state.mode.as_str())
        .bind(state.override_active)
        .bind(state.prior_mode.map(SystemMode::as_str))
        .execute(executor)
        .await
        .map_err(StorageError::from)?;
    Ok(())
}

impl SystemRepository for SqliteSystemRepository {
    fn get(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let pool = self.pool.clone();
        async move { fetch(&pool).await }
    }

    fn set_mode(&self, mode: SystemMode) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(UPDATE_MODE)
                .bind(mode.as_str())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(())
        }
    }

    fn set_override(
        &self,
        mode: SystemMode,
    ) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            let mut state = fetch(&mut *tx).await?;
            state.apply_override(mode);
            write_override(&mut tx, &state).await?;
            tx.commit().await.map_err(StorageError::from)?;
            Ok(state)
        }
    }

    fn clear_override(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            let mut tx = pool.begin().await.map_err(StorageError::from)?;
            let mut state = fetch(&mut *tx).await?;
            state.clear_override();
            write_override(&mut tx, &state).await?;
            tx.commit().await.map_err(StorageError::from)?;
            Ok(state)
        }
    }

    fn set_recirculation(
        &self,
        active: bool,
        started_at: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        let pool = self.pool.clone();
        async move {
            let started_at = if active { started_at } else { None };
            sqlx::query(UPDATE_RECIRCULATION)
                .bind(active)
                .bind(started_at)
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;
            Ok(())
        }
    }
}
