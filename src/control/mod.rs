// src/control/mod.rs - Heater command types and the control core
pub mod mode;
pub mod setpoint;
pub mod state;

pub use mode::{Decision, DecisionPath, ModeSelector};
pub use setpoint::{PidAccumulator, SetpointController, MAX_SETPOINT};
pub use state::{ControllerState, DisplayUnits, RequestedState, StatusUpdate, TempSource};

use serde::{Deserialize, Serialize};

/// Operating mode requested from the heating element.
///
/// Both heat modes run the element at full power towards a setpoint; they
/// differ in what the setpoint means to the device service, so the two wire
/// codes must never be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaterMode {
    /// Mode 0.
    Off,
    /// Mode 5: the setpoint is a room temperature, regulated against the element's own sensor.
    HeatAbsolute,
    /// Mode 6: the setpoint is a radiator surface temperature computed by this crate.
    HeatFeedback,
}

impl HeaterMode {
    pub fn code(self) -> u8 {
        match self {
            HeaterMode::Off => 0,
            HeaterMode::HeatAbsolute => 5,
            HeaterMode::HeatFeedback => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(HeaterMode::Off),
            5 => Some(HeaterMode::HeatAbsolute),
            6 => Some(HeaterMode::HeatFeedback),
            _ => None,
        }
    }
}

/// A logical command for the device service: mode plus setpoint in °C.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeaterCommand {
    pub mode: HeaterMode,
    pub setpoint: f64,
}

impl HeaterCommand {
    pub fn new(mode: HeaterMode, setpoint: f64) -> Self {
        Self { mode, setpoint }
    }

    pub fn off() -> Self {
        Self {
            mode: HeaterMode::Off,
            setpoint: 0.0,
        }
    }
}

impl std::fmt::Display for HeaterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mode {} @ {:.1}°C", self.mode.code(), self.setpoint)
    }
}
