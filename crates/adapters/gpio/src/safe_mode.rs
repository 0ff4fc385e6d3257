//! Read-only wrapper for running against live hardware without touching it.

use std::future::Future;

use hvac_app::ports::PinDriver;
use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;

/// Passes level reads to the inner driver and drops every write.
#[derive(Debug, Clone, Default)]
pub struct SafeModeDriver<D> {
    inner: D,
}

impl<D> SafeModeDriver<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }
}

impl<D: PinDriver> PinDriver for SafeModeDriver<D> {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        tracing::info!(pin = pin.number, "safe mode: skipping activate");
        async { Ok(()) }
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        tracing::info!(pin = pin.number, "safe mode: skipping deactivate");
        async { Ok(()) }
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        self.inner.read_level(number)
    }
}
