// src/control/mode.rs - Requested state + sensor source -> heater command
use std::time::Duration;

use super::{
    ControllerState, HeaterCommand, HeaterMode, RequestedState, SetpointController, TempSource,
};

/// Which branch produced a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPath {
    Off,
    Drying,
    /// Target passed straight to the element, which regulates on its own sensor.
    Direct,
    ClosedLoop,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub command: HeaterCommand,
    pub path: DecisionPath,
}

/// Chooses between a fixed command and a closed-loop setpoint.
#[derive(Debug, Clone, Default)]
pub struct ModeSelector {
    controller: SetpointController,
}

impl ModeSelector {
    pub fn new(controller: SetpointController) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &SetpointController {
        &self.controller
    }

    /// `dt` is forwarded to the setpoint controller on the closed-loop path.
    pub fn decide(&self, state: &mut ControllerState, dt: Duration) -> Decision {
        match (state.requested_state, state.temp_source) {
            (RequestedState::Off, _) => match state.valid_drying_setpoint() {
                Some(drying) => Decision {
                    command: HeaterCommand::new(HeaterMode::HeatFeedback, drying),
                    path: DecisionPath::Drying,
                },
                None => Decision {
                    command: HeaterCommand::off(),
                    path: DecisionPath::Off,
                },
            },
            (RequestedState::Heat, TempSource::ElementSensor) => Decision {
                command: HeaterCommand::new(HeaterMode::HeatAbsolute, state.target_temperature),
                path: DecisionPath::Direct,
            },
            (RequestedState::Heat, TempSource::ExternalProbe | TempSource::Unknown) => {
                let command = self.controller.compute(
                    &mut state.pid,
                    state.target_temperature,
                    state.current_room_temp,
                    dt,
                );
                Decision {
                    command,
                    path: DecisionPath::ClosedLoop,
                }
            }
        }
    }
}
