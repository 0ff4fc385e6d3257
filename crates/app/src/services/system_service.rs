//! System service — status and mode use-cases for the whole plant.

use hvac_domain::error::HvacError;
use hvac_domain::id::SensorId;
use hvac_domain::mode::SystemMode;
use hvac_domain::system::SystemState;

use crate::ports::{SystemRepository, TemperatureSource};

/// The system singleton plus the buffer tank temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub state: SystemState,
    pub buffer_temperature: Option<f64>,
}

pub struct SystemService<S, T> {
    system: S,
    temperatures: T,
}

impl<S: SystemRepository, T: TemperatureSource> SystemService<S, T> {
    pub fn new(system: S, temperatures: T) -> Self {
        Self {
            system,
            temperatures,
        }
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn get_status(&self) -> Result<SystemStatus, HvacError> {
        let state = self.system.get().await?;
        Ok(SystemStatus {
            state,
            buffer_temperature: self.temperatures.temperature(&SensorId::buffer_tank()),
        })
    }

    /// Current system mode.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn get_mode(&self) -> Result<SystemMode, HvacError> {
        Ok(self.system.get().await?.mode)
    }

    /// Write a new system mode through to the store.
    ///
    /// While the failsafe override is up the write still lands; the override
    /// restores its own prior mode when it releases.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn set_mode(&self, mode: SystemMode) -> Result<SystemState, HvacError> {
        let before = self.system.get().await?;
        if before.override_active {
            tracing::warn!(%mode, "system mode changed while failsafe override is active");
        }
        self.system.set_mode(mode).await?;
        tracing::info!(from = %before.mode, to = %mode, "system mode changed");
        self.system.get().await
    }
}
