// src/thermostat/mod.rs - One task per heating element
pub mod channel;
pub mod handle;

pub use channel::{ThermostatEvent, ThermostatRequest, ThermostatSnapshot};
pub use handle::ThermostatHandle;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::{ConfigError, ControlConfig, ElementConfig};
use crate::control::{ControllerState, HeaterMode, ModeSelector, SetpointController, StatusUpdate};
use crate::device::{DeviceError, DeviceStatus, HeaterService};
use crate::scheduler::Timer;

const REQUEST_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum ThermostatError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("thermostat task has stopped")]
    Closed,
    #[error("unknown element: {0}")]
    UnknownElement(String),
}

/// Result of a network call, posted back to the owning task.
enum Completion {
    Status(Result<DeviceStatus, DeviceError>),
    Command(Result<DeviceStatus, DeviceError>),
}

/// Owns a [`ControllerState`] and everything that mutates it.
///
/// Platform requests, the resample timer, the dispatch debounce and network
/// completions are all handled on this one task, so the state is never
/// touched from two places at once. Network calls run as detached tasks and
/// report back through a channel; their results apply to whatever state is
/// current when they arrive.
pub struct Thermostat {
    state: ControllerState,
    selector: ModeSelector,
    service: Arc<dyn HeaterService>,
    requests: mpsc::Receiver<ThermostatRequest>,
    events: broadcast::Sender<ThermostatEvent>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    poll_timer: Timer,
    dispatch_timer: Timer,
    dispatch_debounce: Duration,
    poll_in_flight: bool,
    last_poll_at: Option<DateTime<Utc>>,
}

impl Thermostat {
    /// Builds the task and its handle without starting it. Fails on invalid element config.
    pub fn new(
        element: &ElementConfig,
        control: &ControlConfig,
        service: Arc<dyn HeaterService>,
    ) -> Result<(Self, ThermostatHandle), ThermostatError> {
        let state = ControllerState::new(element, control)?;
        let (requests_tx, requests) = mpsc::channel(REQUEST_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let handle = ThermostatHandle::new(state.name.clone(), requests_tx, events.clone());

        let thermostat = Self {
            state,
            selector: ModeSelector::new(SetpointController::from_config(control)),
            service,
            requests,
            events,
            completions_tx,
            completions,
            poll_timer: Timer::new(),
            dispatch_timer: Timer::new(),
            dispatch_debounce: control.dispatch_debounce(),
            poll_in_flight: false,
            last_poll_at: None,
        };
        Ok((thermostat, handle))
    }

    /// Builds the task and spawns it on the current runtime.
    pub fn spawn(
        element: &ElementConfig,
        control: &ControlConfig,
        service: Arc<dyn HeaterService>,
    ) -> Result<(ThermostatHandle, JoinHandle<()>), ThermostatError> {
        let (thermostat, handle) = Self::new(element, control, service)?;
        let task = tokio::spawn(thermostat.run());
        Ok((handle, task))
    }

    pub async fn run(mut self) {
        tracing::info!(
            "{}: controlling {} (poll every {}s, degraded {}s)",
            self.state.name,
            self.state.address,
            self.state.poll.nominal().as_secs(),
            self.state.poll.degraded().as_secs()
        );

        // First resample goes out immediately rather than after a full interval.
        self.fire_poll();

        loop {
            tokio::select! {
                biased;
                request = self.requests.recv() => match request {
                    Some(ThermostatRequest::Shutdown) | None => break,
                    Some(request) => self.handle_request(request),
                },
                Some(done) = self.completions.recv() => self.handle_completion(done),
                _ = self.dispatch_timer.expired() => {
                    self.dispatch_timer.cancel();
                    self.dispatch("target changed");
                }
                _ = self.poll_timer.expired() => self.fire_poll(),
            }
        }

        self.poll_timer.cancel();
        self.dispatch_timer.cancel();
        tracing::info!("{}: controller stopped", self.state.name);
    }

    fn handle_request(&mut self, request: ThermostatRequest) {
        match request {
            ThermostatRequest::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            ThermostatRequest::SetTarget { celsius, respond_to } => {
                tracing::info!("{}: target temperature {:.1}°C", self.state.name, celsius);
                self.state.target_temperature = celsius;
                let _ = respond_to.send(());
                if !self.dispatch_timer.arm_if_idle(self.dispatch_debounce) {
                    tracing::debug!("{}: dispatch already pending, coalescing", self.state.name);
                }
            }
            ThermostatRequest::SetState { state, respond_to } => {
                tracing::info!("{}: requested state {:?}", self.state.name, state);
                self.state.requested_state = state;
                let _ = respond_to.send(());
                self.dispatch_timer.cancel();
                self.dispatch("state changed");
            }
            ThermostatRequest::SetUnits { units, respond_to } => {
                self.state.display_units = units;
                let _ = respond_to.send(());
            }
            ThermostatRequest::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Status(Ok(status)) => {
                self.poll_in_flight = false;
                self.last_poll_at = Some(Utc::now());
                self.state.consecutive_failures = 0;
                tracing::debug!(
                    "{}: status room={:?} source={:?}",
                    self.state.name,
                    status.room_current_temp,
                    status.room_temp_source
                );
                let update = self.state.apply_status(&status);
                self.publish_update(update);

                // The poll dispatch supersedes any pending debounced one.
                self.dispatch_timer.cancel();
                self.dispatch("poll");

                if self.state.poll.on_success() {
                    self.reschedule();
                }
            }
            Completion::Status(Err(e)) => {
                self.poll_in_flight = false;
                self.state.consecutive_failures += 1;
                tracing::warn!(
                    "{}: status read failed ({} in a row): {}",
                    self.state.name,
                    self.state.consecutive_failures,
                    e
                );
                self.publish(ThermostatEvent::PollFailed {
                    error: e.to_string(),
                    consecutive: self.state.consecutive_failures,
                });
                if self.state.poll.on_failure() {
                    self.reschedule();
                }
            }
            Completion::Command(Ok(echo)) => {
                let update = self.state.apply_status(&echo);
                self.publish_update(update);
            }
            Completion::Command(Err(e)) => {
                tracing::warn!("{}: command failed: {}", self.state.name, e);
                self.publish(ThermostatEvent::CommandFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn fire_poll(&mut self) {
        self.poll_timer.arm(self.state.poll.interval());
        if self.poll_in_flight {
            tracing::debug!("{}: previous status read still in flight, skipping", self.state.name);
            return;
        }
        self.poll_in_flight = true;

        let service = self.service.clone();
        let address = self.state.address.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = service.status(&address).await;
            let _ = completions.send(Completion::Status(result));
        });
    }

    fn reschedule(&mut self) {
        let interval = self.state.poll.interval();
        self.poll_timer.cancel();
        self.poll_timer.arm(interval);
        tracing::info!(
            "{}: poll interval now {}s ({:?})",
            self.state.name,
            interval.as_secs(),
            self.state.poll.state()
        );
        self.publish(ThermostatEvent::PollIntervalChanged {
            state: self.state.poll.state(),
            interval_ms: interval.as_millis() as u64,
        });
    }

    fn dispatch(&mut self, reason: &str) {
        // dt is the configured sample interval, not the time since the last sample.
        let dt = self.state.poll.interval();
        let decision = self.selector.decide(&mut self.state, dt);
        let command = decision.command;
        tracing::info!(
            "{}: {} -> {} ({:?}, room {:.1}°C, target {:.1}°C)",
            self.state.name,
            reason,
            command,
            decision.path,
            self.state.current_room_temp,
            self.state.target_temperature
        );
        self.state.last_command = Some(command);
        self.publish(ThermostatEvent::CommandIssued { command });

        let service = self.service.clone();
        let address = self.state.address.clone();
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = service.set(&address, command).await;
            let _ = completions.send(Completion::Command(result));
        });
    }

    fn publish_update(&self, update: StatusUpdate) {
        if let Some(celsius) = update.room_temperature {
            self.publish(ThermostatEvent::RoomTemperature { celsius });
        }
        if let Some(source) = update.source {
            self.publish(ThermostatEvent::SourceChanged { source });
        }
    }

    fn publish(&self, event: ThermostatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> ThermostatSnapshot {
        let s = &self.state;
        let status = s.last_status.as_ref();
        ThermostatSnapshot {
            name: s.name.clone(),
            address: s.address.clone(),
            target_temperature: s.target_temperature,
            current_room_temp: s.current_room_temp,
            temp_source: s.temp_source,
            requested_state: s.requested_state,
            is_heating: s.is_heating(),
            display_units: s.display_units,
            drying_setpoint: s.valid_drying_setpoint(),
            poll_state: s.poll.state(),
            poll_interval_ms: s.poll.interval().as_millis() as u64,
            consecutive_failures: s.consecutive_failures,
            last_command: s.last_command,
            device_mode: status.and_then(|st| st.mode).and_then(HeaterMode::from_code),
            heater_current_temp: status.and_then(|st| st.heater_current_temp),
            heater_target_temp: status.and_then(|st| st.heater_target_temp),
            last_poll_at: self.last_poll_at,
        }
    }
}
