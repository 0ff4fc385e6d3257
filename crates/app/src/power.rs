//! Main power relay, startup pin checks and the process-wide stop signal.

use std::future::Future;

use tokio::sync::watch;

use hvac_domain::error::{FatalError, HvacError};
use hvac_domain::mode::SystemMode;
use hvac_domain::pin::GpioPin;

use crate::ports::{DeviceRepository, PinDriver, PowerControl, SystemRepository};

/// What the process has been asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownRequest {
    Running,
    Graceful,
    Fatal(String),
}

impl ShutdownRequest {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Owner of the main power relay.
///
/// Workers subscribe to the stop signal; a fatal cycle error de-energizes the
/// relay and flips the signal to [`ShutdownRequest::Fatal`].
pub struct MainPower<P> {
    pins: P,
    pin: GpioPin,
    signal: watch::Sender<ShutdownRequest>,
}

impl<P: PinDriver> MainPower<P> {
    pub fn new(pins: P, pin: GpioPin) -> Self {
        let (signal, _) = watch::channel(ShutdownRequest::Running);
        Self { pins, pin, signal }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ShutdownRequest> {
        self.signal.subscribe()
    }

    /// Close the main relay once the plant has been checked.
    ///
    /// # Errors
    ///
    /// Returns a hardware error if the relay cannot be driven.
    pub async fn energize(&self) -> Result<(), HvacError> {
        tracing::info!(pin = self.pin.number, "energizing main power relay");
        self.pins.activate(self.pin).await
    }

    /// Open the main relay and ask every worker to stop.
    pub async fn shutdown(&self) {
        self.de_energize().await;
        self.signal.send_if_modified(|current| {
            if current.is_running() {
                *current = ShutdownRequest::Graceful;
                true
            } else {
                false
            }
        });
    }

    async fn de_energize(&self) {
        match self.pins.deactivate(self.pin).await {
            Ok(()) => tracing::info!(pin = self.pin.number, "main power relay deactivated"),
            Err(err) => tracing::error!(error = %err, "failed to deactivate main power relay"),
        }
    }
}

impl<P: PinDriver> PowerControl for MainPower<P> {
    fn emergency_stop(&self, reason: &HvacError) -> impl Future<Output = ()> + Send {
        let reason = reason.to_string();
        async move {
            tracing::error!(%reason, "emergency stop");
            self.de_energize().await;
            self.signal.send_replace(ShutdownRequest::Fatal(reason));
        }
    }
}

/// A relay and the state it must be in before the plant is energized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingPin {
    pub name: String,
    pub pin: GpioPin,
    pub active: bool,
}

impl RestingPin {
    fn new(name: impl Into<String>, pin: GpioPin, active: bool) -> Self {
        Self {
            name: name.into(),
            pin,
            active,
        }
    }
}

/// Expected resting state of every relay, main power last.
///
/// Everything rests inactive except heat-pump mode pins, which rest active
/// exactly when the stored system mode is cooling and the pump is online
/// and allowed to cool.
///
/// # Errors
///
/// Returns a storage error propagated from the repositories.
pub async fn resting_pins<S, D>(system: &S, devices: &D) -> Result<Vec<RestingPin>, HvacError>
where
    S: SystemRepository,
    D: DeviceRepository,
{
    let state = system.get().await?;
    let mut pins = Vec::new();

    for pump in devices.heat_pumps().await? {
        let cooling = state.mode == SystemMode::Cooling
            && pump.device.online
            && pump.device.supports(SystemMode::Cooling);
        pins.push(RestingPin::new(&pump.device.name, pump.device.pin, false));
        pins.push(RestingPin::new(
            format!("{}.mode", pump.device.name),
            pump.mode_pin,
            cooling,
        ));
    }
    for handler in devices.air_handlers().await? {
        pins.push(RestingPin::new(&handler.device.name, handler.device.pin, false));
        pins.push(RestingPin::new(
            format!("{}.circ_pump", handler.device.name),
            handler.circ_pump_pin,
            false,
        ));
    }
    for boiler in devices.boilers().await? {
        pins.push(RestingPin::new(boiler.device.name, boiler.device.pin, false));
    }
    for radiant in devices.radiant_loops().await? {
        pins.push(RestingPin::new(radiant.device.name, radiant.device.pin, false));
    }
    pins.push(RestingPin::new("main_power", state.main_power_pin, false));
    Ok(pins)
}

/// Drive every relay to its resting state, as a freshly booted board would be.
///
/// # Errors
///
/// Returns the first storage or hardware error.
pub async fn rest_all_pins<P, S, D>(pins: &P, system: &S, devices: &D) -> Result<(), HvacError>
where
    P: PinDriver,
    S: SystemRepository,
    D: DeviceRepository,
{
    for resting in resting_pins(system, devices).await? {
        if resting.active {
            pins.activate(resting.pin).await?;
        } else {
            pins.deactivate(resting.pin).await?;
        }
    }
    Ok(())
}

/// Refuse to start unless every relay is in its resting state.
///
/// # Errors
///
/// Returns [`FatalError::UnsafePinState`] for the first pin out of place, or
/// a storage/hardware error.
pub async fn check_startup_pins<P, S, D>(pins: &P, system: &S, devices: &D) -> Result<(), HvacError>
where
    P: PinDriver,
    S: SystemRepository,
    D: DeviceRepository,
{
    for resting in resting_pins(system, devices).await? {
        if pins.currently_active(resting.pin).await? != resting.active {
            return Err(FatalError::UnsafePinState {
                name: resting.name,
                pin: resting.pin.number,
                expected_active: resting.active,
            }
            .into());
        }
    }
    tracing::info!("startup pin states verified");
    Ok(())
}
