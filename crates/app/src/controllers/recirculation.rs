//! Recirculation controller — moves stagnant air in idle zones.

use std::future::Future;

use hvac_domain::distribution::ZoneCommand;
use hvac_domain::error::HvacError;
use hvac_domain::recirculation::{
    BlowerState, RecirculationAction, RecirculationPolicy, evaluate_recirculation,
};
use hvac_domain::time::now;

use crate::actuator::Actuator;
use crate::equipment::{AirHandlerTiming, ZoneEquipment};
use crate::ports::{DeviceRepository, SystemRepository, ZoneRepository};
use crate::worker::Controller;

pub struct RecirculationController<S, Z, D, A> {
    system: S,
    zones: Z,
    devices: D,
    actuator: A,
    policy: RecirculationPolicy,
    timing: AirHandlerTiming,
}

impl<S, Z, D, A> RecirculationController<S, Z, D, A>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
{
    pub fn new(
        system: S,
        zones: Z,
        devices: D,
        actuator: A,
        policy: RecirculationPolicy,
        timing: AirHandlerTiming,
    ) -> Self {
        Self {
            system,
            zones,
            devices,
            actuator,
            policy,
            timing,
        }
    }

    /// The recirculation flag is shared by every zone. It is lowered only
    /// once no blower is left in a forced run.
    ///
    /// # Errors
    ///
    /// Returns hardware/storage errors as they come.
    pub async fn evaluate(&self) -> Result<(), HvacError> {
        let current = now();
        let mut system = self.system.get().await?;

        if system.recirculation_stuck(current, self.policy.watchdog_limit()) {
            tracing::warn!(
                started_at = ?system.recirculation_started_at,
                "recirculation flag stuck, clearing it"
            );
            self.system.set_recirculation(false, None).await?;
            system.set_recirculation(false, None);
        }

        let mut stopped = false;
        let mut still_forced = false;
        for zone in self.zones.get_all().await? {
            let Some(handler) = self.devices.air_handler_for_zone(&zone.id).await? else {
                continue;
            };

            let blower_active = self.actuator.currently_active(handler.device.pin).await?;
            let pump_active = self.actuator.currently_active(handler.circ_pump_pin).await?;
            let state = BlowerState {
                blower_active,
                pump_active,
                since_last_change: handler.device.since_last_change(current),
                can_toggle: handler.device.can_toggle(blower_active, current),
            };
            let action = evaluate_recirculation(&self.policy, &state, system.mode, zone.mode);

            let mut equipment = ZoneEquipment {
                air_handler: Some(handler),
                radiant_loop: None,
            };
            match action {
                RecirculationAction::StartBlower => {
                    tracing::info!(zone = %zone.id, "blower idle too long, starting recirculation");
                    self.system.set_recirculation(true, Some(current)).await?;
                    system.set_recirculation(true, Some(current));
                    still_forced = true;
                    equipment
                        .execute(&self.actuator, &self.timing, &[ZoneCommand::ActivateBlower])
                        .await?;
                }
                RecirculationAction::StopBlower => {
                    tracing::info!(zone = %zone.id, "recirculation complete, stopping blower");
                    equipment
                        .execute(&self.actuator, &self.timing, &[ZoneCommand::DeactivateBlower])
                        .await?;
                    stopped = true;
                }
                RecirculationAction::YieldToDemand => {
                    tracing::debug!(zone = %zone.id, "thermal demand owns the blower");
                }
                RecirculationAction::AlreadyCirculating => {
                    tracing::debug!(zone = %zone.id, "circulate mode keeps the blower on");
                }
                RecirculationAction::None => {
                    // Blower on without demand and not yet due to stop.
                    still_forced |= blower_active;
                }
            }
        }

        if stopped {
            if still_forced {
                tracing::debug!("another blower is still recirculating, keeping the flag raised");
            } else {
                self.system.set_recirculation(false, None).await?;
            }
        }
        Ok(())
    }
}

impl<S, Z, D, A> Controller for RecirculationController<S, Z, D, A>
where
    S: SystemRepository,
    Z: ZoneRepository,
    D: DeviceRepository,
    A: Actuator,
{
    fn name(&self) -> &str {
        "recirculation"
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.evaluate()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::TimeDelta;
    use hvac_domain::device::AirHandler;
    use hvac_domain::mode::SystemMode;
    use hvac_domain::pin::GpioPin;
    use hvac_domain::zone::Zone;

    use super::*;
    use crate::actuator::PinActuator;
    use crate::testing::{FakeDevices, FakePins, FakeSystem, FakeZones, device, zone};

    const BLOWER: GpioPin = GpioPin {
        number: 5,
        active_high: true,
    };
    const PUMP: GpioPin = GpioPin {
        number: 6,
        active_high: true,
    };

    type Subject = RecirculationController<
        Arc<FakeSystem>,
        Arc<FakeZones>,
        Arc<FakeDevices>,
        PinActuator<Arc<FakePins>, Arc<FakeDevices>>,
    >;

    fn fixture(system_mode: SystemMode, idle_for: TimeDelta) -> (Arc<FakeSystem>, Arc<FakePins>, Subject) {
        let system = Arc::new(FakeSystem::with_mode(system_mode));
        let zones = Arc::new(FakeZones::with(vec![
            Zone::builder()
                .id(zone("basement"))
                .label("Basement")
                .capability(SystemMode::Heating)
                .mode(SystemMode::Heating)
                .build()
                .unwrap(),
        ]));
        let devices = Arc::new(FakeDevices::default());
        let mut blower = device("ah_basement", BLOWER.number);
        blower.last_changed = now() - idle_for;
        devices.air_handlers.lock().unwrap().push(AirHandler {
            device: blower,
            zone_id: zone("basement"),
            circ_pump_pin: PUMP,
        });
        let pins = Arc::new(FakePins::default());
        let controller = RecirculationController::new(
            Arc::clone(&system),
            zones,
            Arc::clone(&devices),
            PinActuator::new(Arc::clone(&pins), devices),
            RecirculationPolicy::default(),
            AirHandlerTiming {
                pump_lead: Duration::ZERO,
                blower_purge: Duration::ZERO,
            },
        );
        (system, pins, controller)
    }

    #[tokio::test]
    async fn should_start_blower_after_long_idle() {
        let (system, pins, controller) = fixture(SystemMode::Heating, TimeDelta::hours(13));

        controller.evaluate().await.unwrap();

        assert!(pins.is_active(BLOWER));
        assert!(!pins.is_active(PUMP));
        let state = system.snapshot();
        assert!(state.recirculation_active);
        assert!(state.recirculation_started_at.is_some());
    }

    #[tokio::test]
    async fn should_leave_recently_used_blower_alone() {
        let (system, pins, controller) = fixture(SystemMode::Heating, TimeDelta::hours(2));

        controller.evaluate().await.unwrap();

        assert!(!pins.is_active(BLOWER));
        assert!(!system.snapshot().recirculation_active);
    }

    #[tokio::test]
    async fn should_stop_blower_after_duration() {
        let (system, pins, controller) = fixture(SystemMode::Heating, TimeDelta::minutes(16));
        pins.set_active(BLOWER, true);
        system
            .state
            .lock()
            .unwrap()
            .set_recirculation(true, Some(now() - TimeDelta::minutes(16)));

        controller.evaluate().await.unwrap();

        assert!(!pins.is_active(BLOWER));
        assert!(!system.snapshot().recirculation_active);
    }

    #[tokio::test]
    async fn should_keep_flag_while_another_zone_recirculates() {
        const MAIN_BLOWER: GpioPin = GpioPin {
            number: 16,
            active_high: true,
        };
        const MAIN_PUMP: GpioPin = GpioPin {
            number: 20,
            active_high: true,
        };
        let (system, pins, controller) = fixture(SystemMode::Heating, TimeDelta::minutes(16));
        controller.zones.zones.lock().unwrap().insert(
            0,
            Zone::builder()
                .id(zone("main_floor"))
                .label("Main Floor")
                .capability(SystemMode::Heating)
                .mode(SystemMode::Heating)
                .build()
                .unwrap(),
        );
        let mut main_blower = device("ah_main", MAIN_BLOWER.number);
        main_blower.last_changed = now() - TimeDelta::hours(13);
        controller.devices.air_handlers.lock().unwrap().push(AirHandler {
            device: main_blower,
            zone_id: zone("main_floor"),
            circ_pump_pin: MAIN_PUMP,
        });
        pins.set_active(BLOWER, true);
        system
            .state
            .lock()
            .unwrap()
            .set_recirculation(true, Some(now() - TimeDelta::minutes(16)));

        controller.evaluate().await.unwrap();

        assert!(pins.is_active(MAIN_BLOWER));
        assert!(!pins.is_active(BLOWER));
        assert!(system.snapshot().recirculation_active);
    }

    #[tokio::test]
    async fn should_not_stop_blower_in_circulate_mode() {
        let (_, pins, controller) = fixture(SystemMode::Circulate, TimeDelta::hours(1));
        pins.set_active(BLOWER, true);

        controller.evaluate().await.unwrap();

        assert!(pins.is_active(BLOWER));
    }

    #[tokio::test]
    async fn should_yield_to_thermal_demand() {
        let (_, pins, controller) = fixture(SystemMode::Heating, TimeDelta::hours(1));
        pins.set_active(BLOWER, true);
        pins.set_active(PUMP, true);

        controller.evaluate().await.unwrap();

        assert!(pins.is_active(BLOWER));
        assert!(pins.is_active(PUMP));
    }

    #[tokio::test]
    async fn should_clear_stuck_flag() {
        let (system, _, controller) = fixture(SystemMode::Heating, TimeDelta::hours(1));
        system
            .state
            .lock()
            .unwrap()
            .set_recirculation(true, Some(now() - TimeDelta::minutes(45)));

        controller.evaluate().await.unwrap();

        let state = system.snapshot();
        assert!(!state.recirculation_active);
        assert!(state.recirculation_started_at.is_none());
    }
}
