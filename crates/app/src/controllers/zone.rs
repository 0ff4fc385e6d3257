//! Zone distribution controller — one instance per zone.

use std::future::Future;

use hvac_domain::distribution::{ZoneSnapshot, plan_zone, precautionary_shutdown};
use hvac_domain::error::{HvacError, NotFoundError};
use hvac_domain::id::ZoneId;
use hvac_domain::mode::SystemMode;
use hvac_domain::time::now;

use crate::actuator::Actuator;
use crate::equipment::{AirHandlerTiming, ZoneEquipment};
use crate::ports::{DeviceRepository, SystemRepository, TemperatureSource, ZoneRepository};
use crate::worker::Controller;

/// Drives one zone's air handler and radiant loop toward its setpoint.
///
/// Stands down while the failsafe override is active.
pub struct ZoneController<S, Z, D, A, T> {
    zone_id: ZoneId,
    name: String,
    system: S,
    zones: Z,
    devices: D,
    actuator: A,
    temperatures: T,
    timing: AirHandlerTiming,
}

impl<S, Z, D, A, T> ZoneController<S, Z, D, A, T>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        zone_id: ZoneId,
        system: S,
        zones: Z,
        devices: D,
        actuator: A,
        temperatures: T,
        timing: AirHandlerTiming,
    ) -> Self {
        Self {
            name: format!("zone:{zone_id}"),
            zone_id,
            system,
            zones,
            devices,
            actuator,
            temperatures,
            timing,
        }
    }

    /// One evaluation of the zone.
    ///
    /// Configuration conflicts (opposite modes, circulate without an air
    /// handler, no distributor) are logged and answered with a precautionary
    /// shutdown; they do not fail the cycle.
    ///
    /// # Errors
    ///
    /// Returns [`HvacError::NotFound`] when the zone no longer exists, and
    /// hardware/storage errors as they come.
    pub async fn evaluate(&self) -> Result<(), HvacError> {
        let system = self.system.get().await?;
        if system.override_active {
            tracing::debug!(zone = %self.zone_id, "failsafe override active, standing down");
            return Ok(());
        }

        let zone = self.zones.get_by_id(&self.zone_id).await?.ok_or_else(|| {
            HvacError::from(NotFoundError {
                entity: "Zone",
                id: self.zone_id.to_string(),
            })
        })?;

        let mut equipment = ZoneEquipment::load(&self.devices, &zone.id).await?;
        let (air_handler, radiant_loop) = equipment.sample(&self.actuator, now()).await?;

        let temperature = match self.temperatures.temperature(&zone.sensor_id) {
            Some(temperature) => temperature,
            None if zone.mode == SystemMode::Off => f64::NAN,
            None => {
                tracing::warn!(zone = %zone.id, "no trusted zone temperature, standing down");
                return Ok(());
            }
        };

        let snapshot = ZoneSnapshot {
            system_mode: system.mode,
            temperature,
            air_handler,
            radiant_loop,
            recirculating: system.recirculation_active,
        };
        tracing::debug!(
            zone = %zone.id,
            mode = %zone.mode,
            system_mode = %system.mode,
            temp = temperature,
            setpoint = zone.setpoint,
            "evaluating zone"
        );

        let commands = match plan_zone(&zone, &snapshot) {
            Ok(commands) => commands,
            Err(err) => {
                tracing::error!(zone = %zone.id, error = %err, "zone cannot run as configured, forcing distributors off");
                precautionary_shutdown(&snapshot)
            }
        };

        if !commands.is_empty() {
            tracing::info!(zone = %zone.id, ?commands, temp = temperature, setpoint = zone.setpoint, "switching zone distributors");
        }
        equipment
            .execute(&self.actuator, &self.timing, &commands)
            .await
    }
}

impl<S, Z, D, A, T> Controller for ZoneController<S, Z, D, A, T>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.evaluate()
    }
}
