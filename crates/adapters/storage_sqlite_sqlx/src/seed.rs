//! First-boot seeding from static configuration.
//!
//! The store is seeded once: when the system row already exists nothing is
//! written and runtime state (modes, setpoints, roles, dwell timestamps)
//! survives restarts.

use sqlx::{SqliteConnection, SqlitePool};

use hvac_domain::device::{AirHandler, Boiler, Device, DeviceKind, HeatPump, RadiantFloorLoop};
use hvac_domain::id::ZoneId;
use hvac_domain::mode::SystemMode;
use hvac_domain::pin::GpioPin;
use hvac_domain::sensor::Sensor;
use hvac_domain::time::Timestamp;
use hvac_domain::zone::Zone;

use crate::codec::encode_modes;
use crate::error::StorageError;

/// Everything the store starts with.
#[derive(Debug, Clone)]
pub struct Seed {
    pub main_power_pin: GpioPin,
    pub sensors: Vec<Sensor>,
    pub zones: Vec<Zone>,
    pub heat_pumps: Vec<HeatPump>,
    pub boilers: Vec<Boiler>,
    pub air_handlers: Vec<AirHandler>,
    pub radiant_loops: Vec<RadiantFloorLoop>,
}

impl Seed {
    /// An empty plant behind the given main power relay.
    #[must_use]
    pub fn new(main_power_pin: GpioPin) -> Self {
        Self {
            main_power_pin,
            sensors: Vec::new(),
            zones: Vec::new(),
            heat_pumps: Vec::new(),
            boilers: Vec::new(),
            air_handlers: Vec::new(),
            radiant_loops: Vec::new(),
        }
    }
}

const EXISTS: &str = "SELECT COUNT(*) FROM system WHERE id = 1";
const INSERT_SYSTEM: &str = "INSERT INTO system (id, system_mode, main_power_pin_number, main_power_pin_active_high) VALUES (1, ?, ?, ?)";
const INSERT_SENSOR: &str = "INSERT INTO sensors (id, bus) VALUES (?, ?)";
const INSERT_ZONE: &str = "INSERT INTO zones (id, position, label, setpoint, mode, capabilities, sensor_id) VALUES (?, ?, ?, ?, ?, ?, ?)";
const INSERT_DEVICE: &str = "INSERT INTO devices (name, kind, pin_number, pin_active_high, min_on_secs, min_off_secs, online, last_changed, active_modes, zone_id, mode_pin_number, mode_pin_active_high, circ_pump_pin_number, circ_pump_pin_active_high, is_primary, last_rotated) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// Kind-specific columns of a device row.
#[derive(Default)]
struct Extra<'a> {
    zone_id: Option<&'a ZoneId>,
    mode_pin: Option<GpioPin>,
    circ_pump_pin: Option<GpioPin>,
    is_primary: Option<bool>,
    last_rotated: Option<Timestamp>,
}

async fn insert_device(
    conn: &mut SqliteConnection,
    kind: DeviceKind,
    device: &Device,
    extra: Extra<'_>,
) -> Result<(), StorageError> {
    sqlx::query(INSERT_DEVICE)
        .bind(&device.name)
        .bind(kind.as_str())
        .bind(i64::from(device.pin.number))
        .bind(device.pin.active_high)
        .bind(device.min_on.num_seconds())
        .bind(device.min_off.num_seconds())
        .bind(device.online)
        .bind(device.last_changed)
        .bind(encode_modes(&device.active_modes)?)
        .bind(extra.zone_id.map(ZoneId::as_str))
        .bind(extra.mode_pin.map(|p| i64::from(p.number)))
        .bind(extra.mode_pin.map(|p| p.active_high))
        .bind(extra.circ_pump_pin.map(|p| i64::from(p.number)))
        .bind(extra.circ_pump_pin.map(|p| p.active_high))
        .bind(extra.is_primary)
        .bind(extra.last_rotated)
        .execute(conn)
        .await?;
    Ok(())
}

/// Seed the store unless it already holds a system row.
///
/// Everything is written in one transaction. The system starts `off`, and
/// the first heat pump listed becomes the primary whatever its flag says.
///
/// Returns `true` when the store was seeded by this call.
///
/// # Errors
///
/// Returns [`StorageError`] if a query fails; nothing is written then.
pub async fn seed(pool: &SqlitePool, seed: &Seed) -> Result<bool, StorageError> {
    let mut tx = pool.begin().await?;

    let (existing,): (i64,) = sqlx::query_as(EXISTS).fetch_one(&mut *tx).await?;
    if existing > 0 {
        tracing::debug!("store already seeded");
        return Ok(false);
    }

    sqlx::query(INSERT_SYSTEM)
        .bind(SystemMode::Off.as_str())
        .bind(i64::from(seed.main_power_pin.number))
        .bind(seed.main_power_pin.active_high)
        .execute(&mut *tx)
        .await?;

    for sensor in &seed.sensors {
        sqlx::query(INSERT_SENSOR)
            .bind(sensor.id.as_str())
            .bind(&sensor.bus)
            .execute(&mut *tx)
            .await?;
    }

    for (position, zone) in seed.zones.iter().enumerate() {
        sqlx::query(INSERT_ZONE)
            .bind(zone.id.as_str())
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(&zone.label)
            .bind(zone.setpoint)
            .bind(zone.mode.as_str())
            .bind(encode_modes(&zone.capabilities)?)
            .bind(zone.sensor_id.as_str())
            .execute(&mut *tx)
            .await?;
    }

    for (index, pump) in seed.heat_pumps.iter().enumerate() {
        let extra = Extra {
            mode_pin: Some(pump.mode_pin),
            is_primary: Some(index == 0),
            last_rotated: Some(pump.last_rotated),
            ..Extra::default()
        };
        insert_device(&mut tx, DeviceKind::HeatPump, &pump.device, extra).await?;
    }
    for boiler in &seed.boilers {
        insert_device(&mut tx, DeviceKind::Boiler, &boiler.device, Extra::default()).await?;
    }
    for handler in &seed.air_handlers {
        let extra = Extra {
            zone_id: Some(&handler.zone_id),
            circ_pump_pin: Some(handler.circ_pump_pin),
            ..Extra::default()
        };
        insert_device(&mut tx, DeviceKind::AirHandler, &handler.device, extra).await?;
    }
    for radiant in &seed.radiant_loops {
        let extra = Extra {
            zone_id: Some(&radiant.zone_id),
            ..Extra::default()
        };
        insert_device(&mut tx, DeviceKind::RadiantFloor, &radiant.device, extra).await?;
    }

    tx.commit().await?;
    tracing::info!(
        sensors = seed.sensors.len(),
        zones = seed.zones.len(),
        heat_pumps = seed.heat_pumps.len(),
        boilers = seed.boilers.len(),
        air_handlers = seed.air_handlers.len(),
        radiant_loops = seed.radiant_loops.len(),
        "seeded store from configuration"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use hvac_domain::id::SensorId;

    use super::*;
    use crate::pool::Config;

    async fn pool() -> SqlitePool {
        Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap()
        .pool()
        .clone()
    }

    #[tokio::test]
    async fn should_seed_only_once() {
        let pool = pool().await;
        let mut data = Seed::new(GpioPin::new(26, true));
        data.sensors.push(Sensor {
            id: SensorId::buffer_tank(),
            bus: "28-buffer".to_string(),
        });

        assert!(seed(&pool, &data).await.unwrap());
        assert!(!seed(&pool, &data).await.unwrap());

        let (sensors,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensors")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sensors, 1);
    }

    #[tokio::test]
    async fn should_write_nothing_when_seed_is_inconsistent() {
        let pool = pool().await;
        let mut data = Seed::new(GpioPin::new(26, true));
        // Zone points at a sensor that was never declared.
        data.zones.push(
            Zone::builder()
                .id(ZoneId::new("attic").unwrap())
                .label("Attic")
                .build()
                .unwrap(),
        );

        assert!(seed(&pool, &data).await.is_err());

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM system")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
