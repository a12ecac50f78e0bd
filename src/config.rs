//! # Thermostat Configuration
//!
//! One TOML file describes the device-control service, the platform API
//! listener, the control-law tuning and every managed heating element.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [service]
//! base_url = "http://127.0.0.1:8080"
//!
//! [control]
//! degraded_poll_interval_ms = 90000
//!
//! [[elements]]
//! name = "bathroom"
//! address = "CC:22:37:10:43:4B"
//! drying_temp = 35.0
//! poll_interval_ms = 300000
//! ```
//!
//! Only `elements[].address` has no default. Everything else falls back to
//! the values of the reference installation.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::control::{RequestedState, MAX_SETPOINT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("element '{element}' has no device address")]
    MissingAddress { element: String },
    #[error("element '{element}' has an invalid device address '{address}'")]
    InvalidAddress { element: String, address: String },
    #[error("element '{0}' is configured more than once")]
    DuplicateElement(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the device service, web API, control law and elements.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
}

/// Remote heater-control service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Transport timeout applied by the HTTP client, not by the control core.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Platform-facing HTTP API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// Control-law tuning shared by every element.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControlConfig {
    #[serde(default = "default_kp")]
    pub kp: f64,
    #[serde(default = "default_ki")]
    pub ki: f64,
    #[serde(default = "default_kd")]
    pub kd: f64,
    #[serde(default = "default_integral_limit")]
    pub integral_limit: f64,
    /// Room error (°C) above which the radiator is driven at full output.
    #[serde(default = "default_full_output_threshold")]
    pub full_output_threshold: f64,
    #[serde(default = "default_min_setpoint")]
    pub min_setpoint: f64,
    #[serde(default = "default_max_setpoint")]
    pub max_setpoint: f64,
    #[serde(default = "default_degraded_poll_interval_ms")]
    pub degraded_poll_interval_ms: u64,
    #[serde(default = "default_dispatch_debounce_ms")]
    pub dispatch_debounce_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            kp: default_kp(),
            ki: default_ki(),
            kd: default_kd(),
            integral_limit: default_integral_limit(),
            full_output_threshold: default_full_output_threshold(),
            min_setpoint: default_min_setpoint(),
            max_setpoint: default_max_setpoint(),
            degraded_poll_interval_ms: default_degraded_poll_interval_ms(),
            dispatch_debounce_ms: default_dispatch_debounce_ms(),
        }
    }
}

impl ControlConfig {
    pub fn degraded_poll_interval(&self) -> Duration {
        Duration::from_millis(self.degraded_poll_interval_ms)
    }

    pub fn dispatch_debounce(&self) -> Duration {
        Duration::from_millis(self.dispatch_debounce_ms)
    }

    /// Upper end of the setpoint band, never above [`MAX_SETPOINT`].
    pub fn effective_max_setpoint(&self) -> f64 {
        self.max_setpoint.min(MAX_SETPOINT)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("kp", self.kp),
            ("ki", self.ki),
            ("kd", self.kd),
            ("integral_limit", self.integral_limit),
            ("full_output_threshold", self.full_output_threshold),
            ("min_setpoint", self.min_setpoint),
            ("max_setpoint", self.max_setpoint),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "control.{} must be a finite number, got {}",
                name, value
            )));
        }
        if self.min_setpoint >= self.effective_max_setpoint() {
            return Err(ConfigError::Invalid(format!(
                "control.min_setpoint ({}) must be below control.max_setpoint ({}, capped at {})",
                self.min_setpoint, self.max_setpoint, MAX_SETPOINT
            )));
        }
        if self.min_setpoint <= 0.0 {
            return Err(ConfigError::Invalid("control.min_setpoint must be > 0".to_string()));
        }
        if self.integral_limit < 0.0 {
            return Err(ConfigError::Invalid("control.integral_limit must be >= 0".to_string()));
        }
        if self.degraded_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "control.degraded_poll_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// A single managed heating element.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ElementConfig {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Keep-warm radiator temperature used instead of switching off. Ignored below 30.
    #[serde(default)]
    pub drying_temp: Option<f64>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_target_temperature")]
    pub target_temperature: f64,
    /// Requested state until the platform sends one.
    #[serde(default)]
    pub initial_state: RequestedState,
}

impl ElementConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: Some(address.into()),
            drying_temp: None,
            poll_interval_ms: default_poll_interval_ms(),
            target_temperature: default_target_temperature(),
            initial_state: RequestedState::Off,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the normalised (upper-case) device address.
    pub fn device_address(&self) -> Result<String, ConfigError> {
        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ConfigError::MissingAddress {
                element: self.name.clone(),
            })?;
        normalize_address(address).ok_or_else(|| ConfigError::InvalidAddress {
            element: self.name.clone(),
            address: address.to_string(),
        })
    }

    /// Checks the element against the shared control tuning.
    pub fn validate(&self, control: &ControlConfig) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("element name cannot be empty".to_string()));
        }
        self.device_address()?;
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(format!(
                "element '{}' poll_interval_ms must be > 0",
                self.name
            )));
        }
        if let Some(drying) = self.drying_temp {
            if !drying.is_finite() || drying > control.effective_max_setpoint() {
                return Err(ConfigError::Invalid(format!(
                    "element '{}' drying_temp {} must not exceed {}°C",
                    self.name,
                    drying,
                    control.effective_max_setpoint()
                )));
            }
            if drying < 30.0 {
                tracing::warn!(
                    "Element '{}': drying_temp {:.1}°C is below 30°C and will be ignored",
                    self.name,
                    drying
                );
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.elements.is_empty() {
            return Err(ConfigError::Invalid("no [[elements]] configured".to_string()));
        }
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("service.base_url cannot be empty".to_string()));
        }
        self.control.validate()?;
        let mut seen = HashSet::new();
        for element in &self.elements {
            element.validate(&self.control)?;
            if !seen.insert(element.name.as_str()) {
                return Err(ConfigError::DuplicateElement(element.name.clone()));
            }
        }
        Ok(())
    }
}

/// Accepts six colon-separated two-digit hex groups, e.g. `cc:22:37:10:43:4b`.
pub fn normalize_address(address: &str) -> Option<String> {
    let parts: Vec<&str> = address.split(':').collect();
    let well_formed = parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()));
    well_formed.then(|| address.to_ascii_uppercase())
}

// Default value functions
fn default_base_url() -> String { "http://127.0.0.1:8080".to_string() }
fn default_timeout_secs() -> u64 { 60 }
fn default_listen() -> String { "0.0.0.0:3000".to_string() }
fn default_kp() -> f64 { 29.0 }
fn default_ki() -> f64 { 0.5 }
fn default_kd() -> f64 { 5.0 }
fn default_integral_limit() -> f64 { 10.0 }
fn default_full_output_threshold() -> f64 { 1.0 }
fn default_min_setpoint() -> f64 { 30.0 }
fn default_max_setpoint() -> f64 { 59.0 }
fn default_degraded_poll_interval_ms() -> u64 { 90_000 }
fn default_dispatch_debounce_ms() -> u64 { 250 }
fn default_poll_interval_ms() -> u64 { 300_000 }
fn default_target_temperature() -> f64 { 20.0 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}
