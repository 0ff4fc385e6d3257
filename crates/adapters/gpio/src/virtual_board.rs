//! In-memory pins and probes for development and tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use hvac_app::ports::{PinDriver, SensorReader};
use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;

use crate::error::GpioError;

/// Pin levels kept in memory. Unset pins read low.
///
/// Clones share the same board.
#[derive(Debug, Clone, Default)]
pub struct VirtualPinBoard {
    levels: Arc<Mutex<HashMap<u8, bool>>>,
}

impl VirtualPinBoard {
    /// Force the electrical level of a pin.
    pub fn set_level(&self, number: u8, level: bool) {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(number, level);
    }

    #[must_use]
    pub fn level(&self, number: u8) -> bool {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&number)
            .copied()
            .unwrap_or(false)
    }

    /// Whether `pin` is logically active.
    #[must_use]
    pub fn is_active(&self, pin: GpioPin) -> bool {
        pin.is_active_level(self.level(pin.number))
    }
}

impl PinDriver for VirtualPinBoard {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.set_level(pin.number, pin.level_for(true));
        async { Ok(()) }
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.set_level(pin.number, pin.level_for(false));
        async { Ok(()) }
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        let level = self.level(number);
        async move { Ok(level) }
    }
}

/// Temperatures per bus, settable at runtime.
///
/// Buses without a value fall back to the default, if any.
#[derive(Debug, Clone, Default)]
pub struct VirtualSensorReader {
    values: Arc<Mutex<HashMap<String, f64>>>,
    default: Option<f64>,
}

impl VirtualSensorReader {
    /// Every unknown bus reads `fahrenheit`.
    #[must_use]
    pub fn with_default(fahrenheit: f64) -> Self {
        Self {
            values: Arc::default(),
            default: Some(fahrenheit),
        }
    }

    pub fn set(&self, bus: &str, fahrenheit: f64) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bus.to_string(), fahrenheit);
    }
}

impl SensorReader for VirtualSensorReader {
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send {
        let value: Result<f64, HvacError> = self
            .values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bus)
            .copied()
            .or(self.default)
            .ok_or_else(|| GpioError::NoReading(bus.to_string()).into());
        async move { value }
    }
}
