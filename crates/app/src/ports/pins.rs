//! Pin port — relay outputs and level reads.

use std::future::Future;

use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;

/// Drives relay pins. Implementations are polarity-aware through [`GpioPin`].
pub trait PinDriver: Send + Sync {
    /// Energize the relay behind `pin`.
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send;

    /// De-energize the relay behind `pin`.
    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send;

    /// Raw electrical level of a pin (`true` = high).
    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send;

    /// Logical state of `pin`, derived from its level and polarity.
    fn currently_active(&self, pin: GpioPin) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            let level = self.read_level(pin.number).await?;
            Ok(pin.is_active_level(level))
        }
    }
}

impl<T: PinDriver> PinDriver for std::sync::Arc<T> {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).activate(pin)
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).deactivate(pin)
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        (**self).read_level(number)
    }
}
