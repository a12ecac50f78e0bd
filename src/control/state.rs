// src/control/state.rs - Per-element controller state
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ControlConfig, ElementConfig};
use crate::device::DeviceStatus;
use crate::scheduler::PollScheduler;
use super::{HeaterCommand, PidAccumulator, MAX_SETPOINT};

/// Room temperature assumed until the first status read arrives.
pub const NEUTRAL_ROOM_TEMP: f64 = 20.0;

/// Which sensor supplies the room temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempSource {
    #[default]
    Unknown,
    /// The thermistor inside the heating element.
    ElementSensor,
    /// A separate probe (DS18B20) read by the device service.
    ExternalProbe,
}

impl TempSource {
    /// Maps the service's `room_temp_source` string. Unrecognised names map to `Unknown`.
    pub fn from_reported(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "heatingelement" | "element" | "element_sensor" => TempSource::ElementSensor,
            "ds18b20" | "probe" | "external_probe" => TempSource::ExternalProbe,
            _ => TempSource::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedState {
    #[default]
    Off,
    #[serde(alias = "auto")]
    Heat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnits {
    #[default]
    Celsius,
    Fahrenheit,
}

/// What a status read changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusUpdate {
    pub room_temperature: Option<f64>,
    pub source: Option<TempSource>,
}

/// State of one managed heating element.
#[derive(Debug, Clone)]
pub struct ControllerState {
    pub name: String,
    pub address: String,
    pub target_temperature: f64,
    pub current_room_temp: f64,
    pub temp_source: TempSource,
    pub requested_state: RequestedState,
    pub drying_setpoint: Option<f64>,
    pub pid: PidAccumulator,
    pub poll: PollScheduler,
    pub display_units: DisplayUnits,
    pub last_status: Option<DeviceStatus>,
    pub last_command: Option<HeaterCommand>,
    pub consecutive_failures: u32,
}

impl ControllerState {
    pub fn new(element: &ElementConfig, control: &ControlConfig) -> Result<Self, ConfigError> {
        element.validate(control)?;
        let address = element.device_address()?;
        Ok(Self {
            name: element.name.clone(),
            address,
            target_temperature: element.target_temperature,
            current_room_temp: NEUTRAL_ROOM_TEMP,
            temp_source: TempSource::Unknown,
            requested_state: element.initial_state,
            drying_setpoint: element.drying_temp,
            pid: PidAccumulator::default(),
            poll: PollScheduler::new(element.poll_interval(), control.degraded_poll_interval()),
            display_units: DisplayUnits::default(),
            last_status: None,
            last_command: None,
            consecutive_failures: 0,
        })
    }

    /// Drying setpoint, if one is configured at or above 30°C, capped at [`MAX_SETPOINT`].
    pub fn valid_drying_setpoint(&self) -> Option<f64> {
        self.drying_setpoint
            .filter(|t| *t >= 30.0)
            .map(|t| t.min(MAX_SETPOINT))
    }

    /// Informational only; never used for control decisions.
    pub fn is_heating(&self) -> bool {
        self.target_temperature > self.current_room_temp
    }

    /// Applies a reported source. A learned source never falls back to `Unknown`.
    pub fn apply_source(&mut self, reported: &str) -> Option<TempSource> {
        let source = TempSource::from_reported(reported);
        if source == TempSource::Unknown {
            if self.temp_source != TempSource::Unknown {
                tracing::debug!(
                    "{}: ignoring unrecognised temperature source '{}'",
                    self.name,
                    reported
                );
            }
            return None;
        }
        if source == self.temp_source {
            return None;
        }
        tracing::info!("{}: temperature source {:?} -> {:?}", self.name, self.temp_source, source);
        self.temp_source = source;
        Some(source)
    }

    pub fn apply_room_temperature(&mut self, celsius: f64) -> Option<f64> {
        if !celsius.is_finite() || celsius == self.current_room_temp {
            return None;
        }
        self.current_room_temp = celsius;
        Some(celsius)
    }

    /// Folds a status read (or a command echo) into the state.
    pub fn apply_status(&mut self, status: &DeviceStatus) -> StatusUpdate {
        let update = StatusUpdate {
            room_temperature: status
                .room_current_temp
                .and_then(|t| self.apply_room_temperature(t)),
            source: status
                .room_temp_source
                .as_deref()
                .and_then(|s| self.apply_source(s)),
        };
        self.last_status = Some(status.clone());
        update
    }
}
