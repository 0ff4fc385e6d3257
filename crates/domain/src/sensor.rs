//! Temperature sensors as stored: an id plus the bus address to read.

use serde::{Deserialize, Serialize};

use crate::error::{HvacError, ValidationError};
use crate::id::SensorId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: SensorId,
    /// 1-Wire device name, e.g. `28-0316a2790aff`.
    pub bus: String,
}

impl Sensor {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] when the bus address is blank.
    pub fn validate(&self) -> Result<(), HvacError> {
        if self.bus.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}
