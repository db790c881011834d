//! JSON handlers for devices.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use lightsync_domain::device::{DeviceId, DeviceRecord};
use lightsync_domain::error::{NotFoundError, SyncError};
use lightsync_domain::intent::LocalIntent;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for registering a device.
#[derive(Deserialize)]
pub struct RegisterDeviceRequest {
    pub id: String,
}

/// Request body for `PUT /api/devices/{id}/light`.
#[derive(Deserialize)]
pub struct SetLightRequest {
    pub on: bool,
}

/// Request body for `PUT /api/devices/{id}/mode`.
#[derive(Deserialize)]
pub struct SetModeRequest {
    pub rgb: bool,
}

/// Request body for `PUT /api/devices/{id}/name`.
#[derive(Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Possible responses from the list and reload endpoints.
pub enum ListResponse {
    Ok(Json<Vec<DeviceRecord>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from endpoints returning a single device.
pub enum DeviceResponse {
    Ok(Json<DeviceRecord>),
}

impl IntoResponse for DeviceResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the register endpoint.
pub enum RegisterResponse {
    Created(Json<DeviceRecord>),
}

impl IntoResponse for RegisterResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/devices`
pub async fn list(State(state): State<AppState>) -> ListResponse {
    ListResponse::Ok(Json(state.engine.snapshot()))
}

/// `GET /api/devices/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError> {
    let id = DeviceId::new(id)?;
    let device = state
        .engine
        .get(&id)
        .ok_or_else(|| SyncError::from(NotFoundError::device(&id)))?;
    Ok(DeviceResponse::Ok(Json(device)))
}

/// `POST /api/devices`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<RegisterResponse, ApiError> {
    let id = DeviceId::new(req.id)?;
    let device = state.engine.register_device(id).await?;
    Ok(RegisterResponse::Created(Json(device)))
}

/// `POST /api/devices/reload`
pub async fn reload(State(state): State<AppState>) -> Result<ListResponse, ApiError> {
    let devices = state.engine.reload().await?;
    Ok(ListResponse::Ok(Json(devices)))
}

/// `POST /api/devices/{id}/toggle-light`
pub async fn toggle_light(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError> {
    apply(&state, id, LocalIntent::ToggleLight).await
}

/// `POST /api/devices/{id}/toggle-mode`
pub async fn toggle_mode(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeviceResponse, ApiError> {
    apply(&state, id, LocalIntent::ToggleMode).await
}

/// `PUT /api/devices/{id}/light`
pub async fn set_light(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetLightRequest>,
) -> Result<DeviceResponse, ApiError> {
    apply(&state, id, LocalIntent::SetLight(req.on)).await
}

/// `PUT /api/devices/{id}/mode`
pub async fn set_mode(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetModeRequest>,
) -> Result<DeviceResponse, ApiError> {
    apply(&state, id, LocalIntent::SetMode(req.rgb)).await
}

/// `PUT /api/devices/{id}/name`
pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Result<DeviceResponse, ApiError> {
    apply(&state, id, LocalIntent::Rename(req.name)).await
}

/// `DELETE /api/devices/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError> {
    let id = DeviceId::new(id)?;
    state.engine.request_local_delete(id).await?;
    Ok(DeleteResponse::NoContent)
}

async fn apply(
    state: &AppState,
    id: String,
    intent: LocalIntent,
) -> Result<DeviceResponse, ApiError> {
    let id = DeviceId::new(id)?;
    let device = state.engine.apply_local_intent(id, intent).await?;
    Ok(DeviceResponse::Ok(Json(device)))
}
