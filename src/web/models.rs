//! Contains the data models for API requests and responses.

use serde::{Deserialize, Serialize};

use crate::control::{DisplayUnits, RequestedState};
use crate::thermostat::ThermostatSnapshot;

/// Every managed element.
#[derive(Serialize)]
pub struct ElementListResponse {
    pub elements: Vec<ThermostatSnapshot>,
}

/// Represents a request to change the room target temperature (°C).
#[derive(Deserialize)]
pub struct TargetRequest {
    pub temperature: f64,
}

/// Represents a request to switch the element on (`heat`/`auto`) or `off`.
#[derive(Deserialize)]
pub struct StateRequest {
    pub state: RequestedState,
}

#[derive(Deserialize)]
pub struct UnitsRequest {
    pub units: DisplayUnits,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
