//! Messages between an element task, its handles and its observers.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::control::{DisplayUnits, HeaterCommand, HeaterMode, RequestedState, TempSource};
use crate::scheduler::PollState;

/// Represents a request sent from a handle to the element task.
#[derive(Debug)]
pub enum ThermostatRequest {
    /// Read the full state.
    Snapshot {
        /// The channel to send the response back on.
        respond_to: oneshot::Sender<ThermostatSnapshot>,
    },
    /// Change the room target; the resulting command is dispatched after a short debounce.
    SetTarget {
        celsius: f64,
        respond_to: oneshot::Sender<()>,
    },
    /// Change the requested on/off state; dispatched straight away.
    SetState {
        state: RequestedState,
        respond_to: oneshot::Sender<()>,
    },
    SetUnits {
        units: DisplayUnits,
        respond_to: oneshot::Sender<()>,
    },
    /// Stop the task and drop any pending resample.
    Shutdown,
}

/// Notifications published to subscribers of an element.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ThermostatEvent {
    RoomTemperature { celsius: f64 },
    SourceChanged { source: TempSource },
    CommandIssued { command: HeaterCommand },
    CommandFailed { error: String },
    PollFailed { error: String, consecutive: u32 },
    PollIntervalChanged { state: PollState, interval_ms: u64 },
}

/// Point-in-time view of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermostatSnapshot {
    pub name: String,
    pub address: String,
    pub target_temperature: f64,
    pub current_room_temp: f64,
    pub temp_source: TempSource,
    pub requested_state: RequestedState,
    pub is_heating: bool,
    pub display_units: DisplayUnits,
    pub drying_setpoint: Option<f64>,
    pub poll_state: PollState,
    pub poll_interval_ms: u64,
    pub consecutive_failures: u32,
    pub last_command: Option<HeaterCommand>,
    pub device_mode: Option<HeaterMode>,
    pub heater_current_temp: Option<f64>,
    pub heater_target_temp: Option<f64>,
    pub last_poll_at: Option<DateTime<Utc>>,
}
