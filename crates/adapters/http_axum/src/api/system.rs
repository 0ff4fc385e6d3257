//! JSON REST handlers for the system singleton.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hvac_app::ports::{
    DeviceRepository, SensorStatusSource, SystemRepository, TemperatureSource, ZoneRepository,
};
use hvac_app::services::system_service::SystemStatus;
use hvac_domain::mode::SystemMode;
use hvac_domain::time::Timestamp;

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/system` body.
#[derive(Debug, Serialize)]
pub struct SystemResponse {
    pub mode: SystemMode,
    pub override_active: bool,
    pub prior_mode: Option<SystemMode>,
    pub recirculation_active: bool,
    pub recirculation_started_at: Option<Timestamp>,
    pub buffer_temperature: Option<f64>,
}

impl From<SystemStatus> for SystemResponse {
    fn from(status: SystemStatus) -> Self {
        let SystemStatus {
            state,
            buffer_temperature,
        } = status;
        Self {
            mode: state.mode,
            override_active: state.override_active,
            prior_mode: state.prior_mode,
            recirculation_active: state.recirculation_active,
            recirculation_started_at: state.recirculation_started_at,
            buffer_temperature,
        }
    }
}

/// Request and response body of the mode endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModeBody {
    pub mode: SystemMode,
}

/// Possible responses from the system endpoints.
pub enum SystemResult {
    Status(Json<SystemResponse>),
    Mode(Json<ModeBody>),
}

impl IntoResponse for SystemResult {
    fn into_response(self) -> Response {
        match self {
            Self::Status(json) => json.into_response(),
            Self::Mode(json) => json.into_response(),
        }
    }
}

/// `GET /api/system`
pub async fn get<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
) -> Result<SystemResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let status = state.system_service.get_status().await?;
    Ok(SystemResult::Status(Json(status.into())))
}

/// `GET /api/system/mode`
pub async fn get_mode<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
) -> Result<SystemResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let mode = state.system_service.get_mode().await?;
    Ok(SystemResult::Mode(Json(ModeBody { mode })))
}

/// `PUT /api/system/mode`
pub async fn set_mode<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
    Json(req): Json<ModeBody>,
) -> Result<SystemResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let updated = state.system_service.set_mode(req.mode).await?;
    Ok(SystemResult::Mode(Json(ModeBody { mode: updated.mode })))
}
