//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use hvac_app::ports::{
    DeviceRepository, SensorStatusSource, SystemRepository, TemperatureSource, ZoneRepository,
};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api` and adds a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level.
pub fn build<S, Z, D, T>(state: AppState<S, Z, D, T>) -> Router
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
