//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod sensors;
#[allow(clippy::missing_errors_doc)]
pub mod system;
#[allow(clippy::missing_errors_doc)]
pub mod zones;

use axum::Router;
use axum::routing::{get, put};

use hvac_app::ports::{
    DeviceRepository, SensorStatusSource, SystemRepository, TemperatureSource, ZoneRepository,
};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, Z, D, T>() -> Router<AppState<S, Z, D, T>>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    Router::new()
        // System
        .route("/system", get(system::get::<S, Z, D, T>))
        .route(
            "/system/mode",
            get(system::get_mode::<S, Z, D, T>).put(system::set_mode::<S, Z, D, T>),
        )
        // Zones
        .route("/zones", get(zones::list::<S, Z, D, T>))
        .route("/zones/{id}", get(zones::get::<S, Z, D, T>))
        .route("/zones/{id}/mode", put(zones::set_mode::<S, Z, D, T>))
        .route("/zones/{id}/setpoint", put(zones::set_setpoint::<S, Z, D, T>))
        // Sensors
        .route("/sensors", get(sensors::list::<S, Z, D, T>))
}
