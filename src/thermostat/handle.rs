// src/thermostat/handle.rs - Platform-facing handle to one element task
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::control::{DisplayUnits, RequestedState};
use super::channel::{ThermostatEvent, ThermostatRequest, ThermostatSnapshot};
use super::ThermostatError;

/// Cloneable handle exposing the thermostat contract of one element.
///
/// Setters return as soon as the element task has updated its state; the
/// resulting network traffic happens in the background.
#[derive(Debug, Clone)]
pub struct ThermostatHandle {
    name: String,
    requests: mpsc::Sender<ThermostatRequest>,
    events: broadcast::Sender<ThermostatEvent>,
}

impl ThermostatHandle {
    pub(crate) fn new(
        name: String,
        requests: mpsc::Sender<ThermostatRequest>,
        events: broadcast::Sender<ThermostatEvent>,
    ) -> Self {
        Self {
            name,
            requests,
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThermostatEvent> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ThermostatRequest,
    ) -> Result<T, ThermostatError> {
        let (respond_to, response) = oneshot::channel();
        self.requests
            .send(make(respond_to))
            .await
            .map_err(|_| ThermostatError::Closed)?;
        response.await.map_err(|_| ThermostatError::Closed)
    }

    pub async fn snapshot(&self) -> Result<ThermostatSnapshot, ThermostatError> {
        self.request(|respond_to| ThermostatRequest::Snapshot { respond_to })
            .await
    }

    pub async fn room_temperature(&self) -> Result<f64, ThermostatError> {
        Ok(self.snapshot().await?.current_room_temp)
    }

    pub async fn target_temperature(&self) -> Result<f64, ThermostatError> {
        Ok(self.snapshot().await?.target_temperature)
    }

    pub async fn set_target_temperature(&self, celsius: f64) -> Result<(), ThermostatError> {
        self.request(|respond_to| ThermostatRequest::SetTarget {
            celsius,
            respond_to,
        })
        .await
    }

    pub async fn requested_state(&self) -> Result<RequestedState, ThermostatError> {
        Ok(self.snapshot().await?.requested_state)
    }

    pub async fn set_requested_state(&self, state: RequestedState) -> Result<(), ThermostatError> {
        self.request(|respond_to| ThermostatRequest::SetState { state, respond_to })
            .await
    }

    /// `target > room`, for display only.
    pub async fn is_heating(&self) -> Result<bool, ThermostatError> {
        Ok(self.snapshot().await?.is_heating)
    }

    pub async fn display_units(&self) -> Result<DisplayUnits, ThermostatError> {
        Ok(self.snapshot().await?.display_units)
    }

    pub async fn set_display_units(&self, units: DisplayUnits) -> Result<(), ThermostatError> {
        self.request(|respond_to| ThermostatRequest::SetUnits { units, respond_to })
            .await
    }

    /// Asks the task to stop. Safe to call on an already stopped element.
    pub async fn shutdown(&self) {
        let _ = self.requests.send(ThermostatRequest::Shutdown).await;
    }
}
