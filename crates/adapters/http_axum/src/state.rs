//! Shared application state for axum handlers.

use std::sync::Arc;

use hvac_app::ports::{
    DeviceRepository, SensorStatusSource, SystemRepository, TemperatureSource, ZoneRepository,
};
use hvac_app::services::system_service::SystemService;
use hvac_app::services::zone_service::ZoneService;

/// Application state shared across all axum handlers.
///
/// Generic over the repositories and the temperature source to avoid dynamic
/// dispatch. `Clone` is implemented manually so the underlying types
/// themselves do not need to be `Clone`; only the `Arc` wrappers are cloned.
pub struct AppState<S, Z, D, T> {
    /// System status and mode.
    pub system_service: Arc<SystemService<S, T>>,
    /// Zone status, mode and setpoint.
    pub zone_service: Arc<ZoneService<Z, D, T>>,
    /// Per-probe filter state.
    pub sensors: T,
}

impl<S, Z, D, T: Clone> Clone for AppState<S, Z, D, T> {
    fn clone(&self) -> Self {
        Self {
            system_service: Arc::clone(&self.system_service),
            zone_service: Arc::clone(&self.zone_service),
            sensors: self.sensors.clone(),
        }
    }
}

impl<S, Z, D, T> AppState<S, Z, D, T>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    /// Create a new application state from service instances.
    pub fn new(
        system_service: SystemService<S, T>,
        zone_service: ZoneService<Z, D, T>,
        sensors: T,
    ) -> Self {
        Self {
            system_service: Arc::new(system_service),
            zone_service: Arc::new(zone_service),
            sensors,
        }
    }
}
