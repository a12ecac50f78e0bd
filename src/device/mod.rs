// src/device/mod.rs - Remote heater-control service interface
pub mod http;

pub use http::HttpHeaterService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::HeaterCommand;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("device service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("device rejected command: {0}")]
    Rejected(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
}

/// Status document returned by `/status` and echoed by `/set`.
///
/// Every field is optional; a missing `room_current_temp` means "no new
/// reading this cycle".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: Option<u8>,
    #[serde(default)]
    pub room_current_temp: Option<f64>,
    #[serde(default)]
    pub room_target_temp: Option<f64>,
    #[serde(default)]
    pub heater_current_temp: Option<f64>,
    #[serde(default)]
    pub heater_target_temp: Option<f64>,
    #[serde(default)]
    pub room_temp_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The two calls the control core makes against the device service.
#[async_trait]
pub trait HeaterService: Send + Sync {
    async fn status(&self, address: &str) -> Result<DeviceStatus, DeviceError>;
    async fn set(&self, address: &str, command: HeaterCommand) -> Result<DeviceStatus, DeviceError>;
}
