//! Defines the Axum API routes and handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::manager::ThermostatManager;
use crate::thermostat::{ThermostatError, ThermostatHandle, ThermostatSnapshot};
use crate::web::models::{
    ElementListResponse, ErrorResponse, StateRequest, TargetRequest, UnitsRequest,
};

pub type AppState = Arc<ThermostatManager>;

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Creates the Axum router with all the API endpoints.
pub fn create_router(manager: AppState) -> Router {
    Router::new()
        .route("/api/v1/elements", get(list_elements))
        .route("/api/v1/elements/{name}", get(get_element).delete(remove_element))
        .route("/api/v1/elements/{name}/target", put(set_target))
        .route("/api/v1/elements/{name}/state", put(set_state))
        .route("/api/v1/elements/{name}/units", put(set_units))
        .with_state(manager)
}

fn api_error(e: ThermostatError) -> ApiError {
    let status = match e {
        ThermostatError::UnknownElement(_) => StatusCode::NOT_FOUND,
        ThermostatError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        ThermostatError::Config(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse { error: e.to_string() }))
}

async fn element(manager: &ThermostatManager, name: &str) -> Result<ThermostatHandle, ApiError> {
    manager.get(name).await.map_err(api_error)
}

/// Handler listing the status of every element.
async fn list_elements(State(manager): State<AppState>) -> Json<ElementListResponse> {
    Json(ElementListResponse {
        elements: manager.snapshots().await,
    })
}

/// Handler to get the current status of one element.
async fn get_element(
    State(manager): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ThermostatSnapshot>, ApiError> {
    let handle = element(&manager, &name).await?;
    handle.snapshot().await.map(Json).map_err(api_error)
}

/// Handler to change the target temperature. The command follows asynchronously.
async fn set_target(
    State(manager): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<TargetRequest>,
) -> Result<StatusCode, ApiError> {
    if !payload.temperature.is_finite() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "temperature must be a finite number".to_string(),
            }),
        ));
    }
    let handle = element(&manager, &name).await?;
    handle
        .set_target_temperature(payload.temperature)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn set_state(
    State(manager): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<StateRequest>,
) -> Result<StatusCode, ApiError> {
    let handle = element(&manager, &name).await?;
    handle
        .set_requested_state(payload.state)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::ACCEPTED)
}

async fn set_units(
    State(manager): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<UnitsRequest>,
) -> Result<StatusCode, ApiError> {
    let handle = element(&manager, &name).await?;
    handle
        .set_display_units(payload.units)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stops an element and cancels its pending resample.
async fn remove_element(
    State(manager): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    manager.remove(&name).await.map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}
