//! Heat source controller — keeps the buffer tank within its band.

use std::future::Future;

use chrono::TimeDelta;

use hvac_domain::device::{Device, HeatPump};
use hvac_domain::error::HvacError;
use hvac_domain::heat_source::{
    ModePinAction, Role, SourceAction, ThresholdSettings, evaluate_source, mode_pin_action,
    select_sources,
};
use hvac_domain::id::SensorId;
use hvac_domain::mode::SystemMode;
use hvac_domain::time::{Timestamp, now};

use crate::actuator::Actuator;
use crate::ports::{DeviceRepository, SystemRepository, TemperatureSource};
use crate::worker::Controller;

#[derive(Debug, Clone, PartialEq)]
pub struct HeatSourceSettings {
    pub thresholds: ThresholdSettings,
    pub rotation_interval: TimeDelta,
}

impl Default for HeatSourceSettings {
    fn default() -> Self {
        Self {
            thresholds: ThresholdSettings::default(),
            rotation_interval: TimeDelta::hours(24),
        }
    }
}

/// Switches the heat pumps and the boiler against the buffer tank temperature.
///
/// The controller keeps running while the failsafe override is up: the
/// override expresses itself through the system mode this controller follows.
pub struct HeatSourceController<S, D, A, T> {
    system: S,
    devices: D,
    actuator: A,
    temperatures: T,
    settings: HeatSourceSettings,
}

impl<S, D, A, T> HeatSourceController<S, D, A, T>
where
    S: SystemRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    pub fn new(system: S, devices: D, actuator: A, temperatures: T, settings: HeatSourceSettings) -> Self {
        Self {
            system,
            devices,
            actuator,
            temperatures,
            settings,
        }
    }

    /// One evaluation of every heat source.
    ///
    /// # Errors
    ///
    /// Returns a fatal error for an inconsistent primary flag or a boiler
    /// evaluated in cooling, and hardware/storage errors as they come.
    pub async fn evaluate(&self) -> Result<(), HvacError> {
        let current = now();
        let mode = self.system.get().await?.mode;
        let mut heat_pumps = self.devices.heat_pumps().await?;

        self.align_mode_pins(&mut heat_pumps, mode, current).await?;

        let Some(buffer_temp) = self.temperatures.temperature(&SensorId::buffer_tank()) else {
            tracing::warn!("no trusted buffer tank temperature, standing down");
            return Ok(());
        };
        tracing::info!(mode = %mode, buffer_temp, "evaluating buffer tank and heat sources");

        let boilers = self.devices.boilers().await?;
        let mut known: Vec<Device> = heat_pumps
            .iter()
            .map(|hp| hp.device.clone())
            .chain(boilers.iter().map(|b| b.device.clone()))
            .collect();

        let sources = select_sources(
            heat_pumps,
            boilers,
            mode,
            current,
            self.settings.rotation_interval,
        )?;
        if sources.rotated {
            self.devices.swap_primary_heat_pump(current).await?;
            tracing::info!(
                primary = sources.primary.as_ref().map(|hp| hp.device.name.as_str()),
                "rotated heat pump roles"
            );
        }

        let mut offered = Vec::new();
        if let Some(mut primary) = sources.primary {
            self.drive(Role::Primary, &mut primary.device, mode, buffer_temp, current)
                .await?;
            offered.push(primary.device.name);
        }
        if let Some(mut secondary) = sources.secondary {
            self.drive(Role::Secondary, &mut secondary.device, mode, buffer_temp, current)
                .await?;
            offered.push(secondary.device.name);
        }
        if let Some(mut tertiary) = sources.tertiary {
            self.drive(Role::Tertiary, &mut tertiary.device, mode, buffer_temp, current)
                .await?;
            offered.push(tertiary.device.name);
        }

        known.retain(|d| !offered.contains(&d.name));
        for device in &mut known {
            self.retire(device, current).await?;
        }
        Ok(())
    }

    async fn drive(
        &self,
        role: Role,
        device: &mut Device,
        mode: SystemMode,
        buffer_temp: f64,
        current: Timestamp,
    ) -> Result<(), HvacError> {
        if mode.is_thermal() && !device.supports(mode) {
            return self.retire(device, current).await;
        }

        let active = self.actuator.currently_active(device.pin).await?;
        let evaluation = evaluate_source(
            &self.settings.thresholds,
            role,
            mode,
            buffer_temp,
            device,
            active,
            current,
        )?;
        tracing::debug!(
            device = %device.name,
            %role,
            buffer_temp,
            threshold = evaluation.threshold,
            currently_active = active,
            should_be_on = evaluation.should_be_on,
            "evaluated heat source"
        );

        match evaluation.action {
            SourceAction::Keep => {}
            SourceAction::Blocked => {
                tracing::debug!(device = %device.name, %role, "toggle held back by dwell time");
            }
            SourceAction::Activate => {
                tracing::info!(device = %device.name, %role, buffer_temp, "activating heat source");
                self.actuator.activate(device).await?;
            }
            SourceAction::Deactivate => {
                tracing::info!(device = %device.name, %role, buffer_temp, "deactivating heat source");
                self.actuator.deactivate(device).await?;
            }
        }
        Ok(())
    }

    /// Switch off a source that is not offered this cycle.
    async fn retire(&self, device: &mut Device, current: Timestamp) -> Result<(), HvacError> {
        if !self.actuator.currently_active(device.pin).await? {
            return Ok(());
        }
        if device.can_toggle(true, current) {
            tracing::info!(device = %device.name, "heat source not offered, switching off");
            self.actuator.deactivate(device).await?;
        } else {
            tracing::debug!(device = %device.name, "heat source not offered, waiting on dwell time");
        }
        Ok(())
    }

    /// Bring every mode-select pin in line with the system mode.
    async fn align_mode_pins(
        &self,
        heat_pumps: &mut [HeatPump],
        mode: SystemMode,
        current: Timestamp,
    ) -> Result<(), HvacError> {
        for pump in heat_pumps.iter_mut() {
            let mode_active = self.actuator.currently_active(pump.mode_pin).await?;
            let pump_active = self.actuator.currently_active(pump.device.pin).await?;
            let can_cool = pump.device.online && pump.device.supports(SystemMode::Cooling);
            let action = mode_pin_action(
                mode,
                mode_active,
                pump_active,
                can_cool,
                pump.device.can_toggle(pump_active, current),
            );

            match action {
                ModePinAction::Aligned => {}
                ModePinAction::SwitchToCooling => {
                    self.actuator.switch(pump.mode_pin, true).await?;
                    tracing::info!(device = %pump.device.name, "switched mode pin from heating to cooling");
                }
                ModePinAction::SwitchToHeating => {
                    self.actuator.switch(pump.mode_pin, false).await?;
                    tracing::info!(device = %pump.device.name, "switched mode pin from cooling to heating");
                }
                ModePinAction::StopPumpFirst => {
                    tracing::info!(device = %pump.device.name, "stopping heat pump before mode change");
                    self.actuator.deactivate(&mut pump.device).await?;
                }
                ModePinAction::Wait => {
                    tracing::debug!(device = %pump.device.name, "mode change waiting on dwell time");
                }
            }
        }
        Ok(())
    }
}

impl<S, D, A, T> Controller for HeatSourceController<S, D, A, T>
where
    S: SystemRepository,
    D: DeviceRepository,
    A: Actuator,
    T: TemperatureSource,
{
    fn name(&self) -> &str {
        "heat_source"
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.evaluate()
    }
}
