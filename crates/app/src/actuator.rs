//! Device actuation capability.
//!
//! Controllers never touch pins directly. They switch equipment through an
//! [`Actuator`], which reads the physical state, drives the relay and persists
//! `last_changed` only when a relay actually moved.

use std::future::Future;

use hvac_domain::device::Device;
use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;
use hvac_domain::time::{Timestamp, now};

use crate::ports::{DeviceRepository, PinDriver};

pub trait Actuator: Send + Sync {
    /// Physical state of `pin`.
    fn currently_active(&self, pin: GpioPin) -> impl Future<Output = Result<bool, HvacError>> + Send;

    /// Drive `pin` to the requested state. Returns whether anything changed.
    fn switch(
        &self,
        pin: GpioPin,
        active: bool,
    ) -> impl Future<Output = Result<bool, HvacError>> + Send;

    /// Stamp and persist a real transition of `device`.
    fn record_change(
        &self,
        device: &mut Device,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;

    /// Dwell-time guard against the device's physical state.
    fn can_toggle(
        &self,
        device: &Device,
        now: Timestamp,
    ) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            let active = self.currently_active(device.pin).await?;
            Ok(device.can_toggle(active, now))
        }
    }

    fn activate(&self, device: &mut Device) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            let changed = self.switch(device.pin, true).await?;
            if changed {
                tracing::info!(device = %device.name, "activated");
                self.record_change(device, now()).await?;
            }
            Ok(changed)
        }
    }

    fn deactivate(
        &self,
        device: &mut Device,
    ) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            let changed = self.switch(device.pin, false).await?;
            if changed {
                tracing::info!(device = %device.name, "deactivated");
                self.record_change(device, now()).await?;
            }
            Ok(changed)
        }
    }
}

/// [`Actuator`] over a pin driver and the device store.
pub struct PinActuator<P, D> {
    pins: P,
    devices: D,
}

impl<P: PinDriver, D: DeviceRepository> PinActuator<P, D> {
    pub fn new(pins: P, devices: D) -> Self {
        Self { pins, devices }
    }
}

impl<P: PinDriver, D: DeviceRepository> Actuator for PinActuator<P, D> {
    fn currently_active(&self, pin: GpioPin) -> impl Future<Output = Result<bool, HvacError>> + Send {
        self.pins.currently_active(pin)
    }

    fn switch(
        &self,
        pin: GpioPin,
        active: bool,
    ) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            if self.pins.currently_active(pin).await? == active {
                return Ok(false);
            }
            if active {
                self.pins.activate(pin).await?;
            } else {
                self.pins.deactivate(pin).await?;
            }
            tracing::debug!(pin = pin.number, active, "relay switched");
            Ok(true)
        }
    }

    fn record_change(
        &self,
        device: &mut Device,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move {
            device.mark_changed(at);
            self.devices.update_last_changed(&device.name, at).await
        }
    }
}

impl<T: Actuator> Actuator for std::sync::Arc<T> {
    fn currently_active(&self, pin: GpioPin) -> impl Future<Output = Result<bool, HvacError>> + Send {
        (**self).currently_active(pin)
    }

    fn switch(
        &self,
        pin: GpioPin,
        active: bool,
    ) -> impl Future<Output = Result<bool, HvacError>> + Send {
        (**self).switch(pin, active)
    }

    fn record_change(
        &self,
        device: &mut Device,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).record_change(device, at)
    }
}
