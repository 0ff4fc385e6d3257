//! Failsafe controller — forces heating or cooling when a zone leaves its
//! absolute safety band, and hands control back once every zone is safe.

use std::future::Future;

use hvac_domain::distribution::shutdown_commands;
use hvac_domain::error::HvacError;
use hvac_domain::failsafe::{
    FailsafeDecision, FailsafeSettings, ZoneTemperature, evaluate_failsafe, override_commands,
};
use hvac_domain::id::ZoneId;
use hvac_domain::time::now;
use hvac_domain::zone::Zone;

use crate::actuator::Actuator;
use crate::equipment::{AirHandlerTiming, ZoneEquipment};
use crate::ports::{DeviceRepository, SystemRepository, TemperatureSource, ZoneRepository};
use crate::worker::Controller;

pub struct FailsafeController<S, Z, D, A, T> {
    system: S,
    zones: Z,
    devices: D,
    actuator: A,
    temperatures: T,
    settings: FailsafeSettings,
    timing: AirHandlerTiming,
}

impl<S, Z, D, A, T> FailsafeController<S, Z, D, A, T>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        system: S,
        zones: Z,
        devices: D,
        actuator: A,
        temperatures: T,
        settings: FailsafeSettings,
        timing: AirHandlerTiming,
    ) -> Self {
        Self {
            system,
            zones,
            devices,
            actuator,
            temperatures,
            settings,
            timing,
        }
    }

    /// One failsafe pass over every zone with a trusted temperature.
    ///
    /// # Errors
    ///
    /// Returns hardware/storage errors as they come.
    pub async fn evaluate(&self) -> Result<FailsafeDecision, HvacError> {
        let system = self.system.get().await?;
        let zones = self.zones.get_all().await?;

        let (readings, unread) = self.read_zones(&zones);
        for zone_id in &unread {
            tracing::warn!(zone = %zone_id, "no trusted temperature, zone left out of failsafe evaluation");
        }

        let decision = evaluate_failsafe(&self.settings, &readings, system.override_active);
        match &decision {
            FailsafeDecision::Engage {
                mode,
                zone_id,
                temperature,
            } => {
                tracing::warn!(
                    zone = %zone_id,
                    temp = temperature,
                    min = self.settings.min_temp,
                    max = self.settings.max_temp,
                    %mode,
                    "zone out of safety bounds, engaging failsafe override"
                );
                self.system.set_override(*mode).await?;

                let mut equipment = ZoneEquipment::load(&self.devices, zone_id).await?;
                let (air_handler, radiant_loop) = equipment.sample(&self.actuator, now()).await?;
                let commands = override_commands(*mode, air_handler, radiant_loop);
                equipment
                    .execute(&self.actuator, &self.timing, &commands)
                    .await?;
            }
            FailsafeDecision::Release => {
                let state = self.system.clear_override().await?;
                tracing::info!(mode = %state.mode, "all zones back in the safe band, releasing failsafe override");

                for zone in &zones {
                    let mut equipment = ZoneEquipment::load(&self.devices, &zone.id).await?;
                    let (air_handler, radiant_loop) =
                        equipment.sample(&self.actuator, now()).await?;
                    let commands =
                        shutdown_commands(air_handler, radiant_loop, state.recirculation_active);
                    equipment
                        .execute(&self.actuator, &self.timing, &commands)
                        .await?;
                }
            }
            FailsafeDecision::Hold => {
                tracing::debug!("failsafe override holding, zone still out of bounds");
            }
            FailsafeDecision::Settling => {
                tracing::debug!("failsafe override holding until zones clear the safety margin");
            }
            FailsafeDecision::Idle => {}
        }
        Ok(decision)
    }

    /// Trusted temperatures, plus the non-exempt zones that have none.
    fn read_zones(&self, zones: &[Zone]) -> (Vec<ZoneTemperature>, Vec<ZoneId>) {
        let mut readings = Vec::with_capacity(zones.len());
        let mut unread = Vec::new();
        for zone in zones {
            match self.temperatures.temperature(&zone.sensor_id) {
                Some(temperature) => readings.push(ZoneTemperature {
                    zone_id: zone.id.clone(),
                    temperature,
                }),
                None if !self.settings.is_exempt(&zone.id) => unread.push(zone.id.clone()),
                None => {}
            }
        }
        (readings, unread)
    }
}

impl<S, Z, D, A, T> Controller for FailsafeController<S, Z, D, A, T>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    fn name(&self) -> &str {
        "failsafe"
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move { self.evaluate().await.map(|_| ()) }
    }
}
