//! A zone's distributors: sampling their state and carrying out commands.

use std::time::Duration;

use hvac_domain::device::{AirHandler, RadiantFloorLoop};
use hvac_domain::distribution::{AirHandlerStatus, LoopStatus, ZoneCommand};
use hvac_domain::error::HvacError;
use hvac_domain::id::ZoneId;
use hvac_domain::time::{Timestamp, now};

use crate::actuator::Actuator;
use crate::ports::DeviceRepository;

/// Delays inside the air-handler switching sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirHandlerTiming {
    /// Circulation pump runs this long before the blower starts.
    pub pump_lead: Duration,
    /// Gap between stopping the blower and stopping the pump.
    pub blower_purge: Duration,
}

impl Default for AirHandlerTiming {
    fn default() -> Self {
        Self {
            pump_lead: Duration::from_secs(5),
            blower_purge: Duration::from_secs(30),
        }
    }
}

/// The air handler and radiant loop serving one zone, if any.
#[derive(Debug, Clone, Default)]
pub struct ZoneEquipment {
    pub air_handler: Option<AirHandler>,
    pub radiant_loop: Option<RadiantFloorLoop>,
}

impl ZoneEquipment {
    /// Load the zone's distributors from the store.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn load<D: DeviceRepository>(devices: &D, zone: &ZoneId) -> Result<Self, HvacError> {
        Ok(Self {
            air_handler: devices.air_handler_for_zone(zone).await?,
            radiant_loop: devices.radiant_loop_for_zone(zone).await?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.air_handler.is_none() && self.radiant_loop.is_none()
    }

    /// Read the physical state of every distributor.
    ///
    /// The air handler's guard follows the blower pin.
    ///
    /// # Errors
    ///
    /// Returns a hardware error when a pin cannot be read.
    pub async fn sample<A: Actuator>(
        &self,
        actuator: &A,
        now: Timestamp,
    ) -> Result<(Option<AirHandlerStatus>, Option<LoopStatus>), HvacError> {
        let air_handler = match &self.air_handler {
            Some(handler) => {
                let blower_active = actuator.currently_active(handler.device.pin).await?;
                let pump_active = actuator.currently_active(handler.circ_pump_pin).await?;
                Some(AirHandlerStatus {
                    blower_active,
                    pump_active,
                    can_toggle: handler.device.can_toggle(blower_active, now),
                })
            }
            None => None,
        };
        let radiant_loop = match &self.radiant_loop {
            Some(radiant) => {
                let active = actuator.currently_active(radiant.device.pin).await?;
                Some(LoopStatus {
                    active,
                    can_toggle: radiant.device.can_toggle(active, now),
                })
            }
            None => None,
        };
        Ok((air_handler, radiant_loop))
    }

    /// Carry out `commands` in order.
    ///
    /// A command for a distributor the zone does not have is skipped.
    ///
    /// # Errors
    ///
    /// Returns the first hardware or storage error; later commands are not run.
    pub async fn execute<A: Actuator>(
        &mut self,
        actuator: &A,
        timing: &AirHandlerTiming,
        commands: &[ZoneCommand],
    ) -> Result<(), HvacError> {
        for command in commands {
            self.execute_one(actuator, timing, *command).await?;
        }
        Ok(())
    }

    async fn execute_one<A: Actuator>(
        &mut self,
        actuator: &A,
        timing: &AirHandlerTiming,
        command: ZoneCommand,
    ) -> Result<(), HvacError> {
        match command {
            ZoneCommand::ActivateLoop | ZoneCommand::DeactivateLoop => {
                let Some(radiant) = self.radiant_loop.as_mut() else {
                    tracing::warn!(?command, "no radiant loop for command");
                    return Ok(());
                };
                if command == ZoneCommand::ActivateLoop {
                    actuator.activate(&mut radiant.device).await?;
                } else {
                    actuator.deactivate(&mut radiant.device).await?;
                }
                Ok(())
            }
            _ => {
                let Some(handler) = self.air_handler.as_mut() else {
                    tracing::warn!(?command, "no air handler for command");
                    return Ok(());
                };
                let changed = air_handler_sequence(actuator, timing, handler, command).await?;
                if changed {
                    tracing::info!(device = %handler.device.name, ?command, "air handler switched");
                    actuator.record_change(&mut handler.device, now()).await?;
                }
                Ok(())
            }
        }
    }
}

/// Pump before blower on the way up, blower before pump on the way down.
async fn air_handler_sequence<A: Actuator>(
    actuator: &A,
    timing: &AirHandlerTiming,
    handler: &AirHandler,
    command: ZoneCommand,
) -> Result<bool, HvacError> {
    let blower = handler.device.pin;
    let pump = handler.circ_pump_pin;
    let changed = match command {
        ZoneCommand::ActivateAirHandler => {
            let pump_changed = actuator.switch(pump, true).await?;
            if pump_changed {
                tokio::time::sleep(timing.pump_lead).await;
            }
            actuator.switch(blower, true).await? | pump_changed
        }
        ZoneCommand::DeactivateAirHandler => {
            let blower_changed = actuator.switch(blower, false).await?;
            if blower_changed {
                tokio::time::sleep(timing.blower_purge).await;
            }
            actuator.switch(pump, false).await? | blower_changed
        }
        ZoneCommand::ActivateBlower => actuator.switch(blower, true).await?,
        ZoneCommand::DeactivateBlower => actuator.switch(blower, false).await?,
        ZoneCommand::DeactivateCirculationPump => actuator.switch(pump, false).await?,
        ZoneCommand::ActivateLoop | ZoneCommand::DeactivateLoop => false,
    };
    Ok(changed)
}
