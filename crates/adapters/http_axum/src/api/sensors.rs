//! JSON REST handler for sensor readings.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use hvac_app::ports::{
    DeviceRepository, SensorStatus, SensorStatusSource, SystemRepository, TemperatureSource,
    ZoneRepository,
};
use hvac_domain::time::Timestamp;

use crate::state::AppState;

/// One probe's latest published reading and filter state.
#[derive(Debug, Serialize)]
pub struct SensorResponse {
    pub sensor_id: String,
    pub zone: String,
    pub temperature: Option<f64>,
    pub read_at: Option<Timestamp>,
    pub disabled: bool,
    pub anomaly_count: usize,
    pub stale: bool,
}

impl From<SensorStatus> for SensorResponse {
    fn from(status: SensorStatus) -> Self {
        Self {
            sensor_id: status.sensor_id.to_string(),
            zone: status.zone,
            temperature: status.temperature,
            read_at: status.read_at,
            disabled: status.disabled,
            anomaly_count: status.anomaly_count,
            stale: status.stale,
        }
    }
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<SensorResponse>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/sensors`
pub async fn list<S, Z, D, T>(State(state): State<AppState<S, Z, D, T>>) -> ListResponse
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let statuses = state.sensors.sensor_statuses();
    ListResponse::Ok(Json(
        statuses.into_iter().map(SensorResponse::from).collect(),
    ))
}
