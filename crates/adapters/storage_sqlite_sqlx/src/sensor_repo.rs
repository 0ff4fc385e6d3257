//! `SQLite` implementation of [`SensorRepository`].

use std::future::Future;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hvac_app::ports::SensorRepository;
use hvac_domain::error::HvacError;
use hvac_domain::id::SensorId;
use hvac_domain::sensor::Sensor;

use crate::codec::decode_error;
use crate::error::StorageError;

struct Wrapper(Sensor);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        Ok(Self(Sensor {
            id: SensorId::new(id).map_err(decode_error)?,
            bus: row.try_get("bus")?,
        }))
    }
}

const SELECT_BY_ID: &str = "SELECT * FROM sensors WHERE id = ?";
const SELECT_ALL: &str = "SELECT * FROM sensors ORDER BY id";

/// `SQLite`-backed sensor repository.
pub struct SqliteSensorRepository {
    pool: SqlitePool,
}

impl SqliteSensorRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SensorRepository for SqliteSensorRepository {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Sensor>, HvacError>> + Send {
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
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<Sensor>, HvacError>> + Send {
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
}

#[cfg(test)]
mod tests {
    use hvac_domain::pin::GpioPin;

    use super::*;
    use crate::pool::Config;
    use crate::seed::{Seed, seed};

    async fn setup() -> SqliteSensorRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        let mut data = Seed::new(GpioPin::new(26, true));
        data.sensors = vec![
            Sensor {
                id: SensorId::buffer_tank(),
                bus: "28-0000000000aa".to_string(),
            },
            Sensor {
                id: SensorId::new("basement").unwrap(),
                bus: "28-0000000000bb".to_string(),
            },
        ];
        seed(db.pool(), &data).await.unwrap();
        SqliteSensorRepository::new(db.pool().clone())
    }

    #[tokio::test]
    async fn should_list_every_sensor() {
        let repo = setup().await;

        let all = repo.get_all().await.unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id.as_str(), "basement");
    }

    #[tokio::test]
    async fn should_find_buffer_tank_sensor() {
        let repo = setup().await;

        let sensor = repo.get_by_id(&SensorId::buffer_tank()).await.unwrap().unwrap();

        assert_eq!(sensor.bus, "28-0000000000aa");
    }

    #[tokio::test]
    async fn should_return_none_when_sensor_not_found() {
        let repo = setup().await;

        let found = repo
            .get_by_id(&SensorId::new("attic").unwrap())
            .await
            .unwrap();

        assert!(found.is_none());
    }
}
