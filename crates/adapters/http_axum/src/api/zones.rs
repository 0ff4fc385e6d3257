//! JSON REST handlers for zones.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use hvac_app::ports::{
    DeviceRepository, SensorStatusSource, SystemRepository, TemperatureSource, ZoneRepository,
};
use hvac_app::services::zone_service::ZoneStatus;
use hvac_domain::id::ZoneId;
use hvac_domain::mode::SystemMode;

use crate::error::ApiError;
use crate::state::AppState;

/// One zone as the API shows it.
#[derive(Debug, Serialize)]
pub struct ZoneResponse {
    pub id: String,
    pub label: String,
    pub setpoint: f64,
    pub mode: SystemMode,
    pub capabilities: Vec<SystemMode>,
    pub temperature: Option<f64>,
}

impl From<ZoneStatus> for ZoneResponse {
    fn from(status: ZoneStatus) -> Self {
        let ZoneStatus { zone, temperature } = status;
        Self {
            id: zone.id.to_string(),
            label: zone.label,
            setpoint: zone.setpoint,
            mode: zone.mode,
            capabilities: zone.capabilities,
            temperature,
        }
    }
}

/// Request body for changing a zone's mode.
#[derive(Debug, Deserialize)]
pub struct SetModeRequest {
    pub mode: SystemMode,
}

/// Request body for changing a zone's setpoint.
#[derive(Debug, Deserialize)]
pub struct SetSetpointRequest {
    pub setpoint: f64,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<ZoneResponse>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the single-zone endpoints.
pub enum ZoneResult {
    Ok(Json<ZoneResponse>),
}

impl IntoResponse for ZoneResult {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// `GET /api/zones`
pub async fn list<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
) -> Result<ListResponse, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let zones = state.zone_service.list_zones().await?;
    Ok(ListResponse::Ok(Json(
        zones.into_iter().map(ZoneResponse::from).collect(),
    )))
}

/// `GET /api/zones/{id}`
pub async fn get<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
    Path(id): Path<String>,
) -> Result<ZoneResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let zone_id = ZoneId::new(id)?;
    let zone = state.zone_service.get_zone(&zone_id).await?;
    Ok(ZoneResult::Ok(Json(zone.into())))
}

/// `PUT /api/zones/{id}/mode`
pub async fn set_mode<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
    Path(id): Path<String>,
    Json(req): Json<SetModeRequest>,
) -> Result<ZoneResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let zone_id = ZoneId::new(id)?;
    let zone = state.zone_service.set_mode(&zone_id, req.mode).await?;
    Ok(ZoneResult::Ok(Json(zone.into())))
}

/// `PUT /api/zones/{id}/setpoint`
pub async fn set_setpoint<S, Z, D, T>(
    State(state): State<AppState<S, Z, D, T>>,
    Path(id): Path<String>,
    Json(req): Json<SetSetpointRequest>,
) -> Result<ZoneResult, ApiError>
where
    S: SystemRepository + 'static,
    Z: ZoneRepository + 'static,
    D: DeviceRepository + 'static,
    T: TemperatureSource + SensorStatusSource + Clone + 'static,
{
    let zone_id = ZoneId::new(id)?;
    let zone = state
        .zone_service
        .set_setpoint(&zone_id, req.setpoint)
        .await?;
    Ok(ZoneResult::Ok(Json(zone.into())))
}
