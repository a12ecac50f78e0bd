// Shared test doubles for the device service
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use moa_thermostat::{DeviceError, DeviceStatus, HeaterCommand, HeaterService};

/// Device service replaying scripted status reads and recording commands.
///
/// The last scripted status repeats once the script runs out.
#[derive(Default)]
pub struct ScriptedService {
    statuses: Mutex<VecDeque<Result<DeviceStatus, String>>>,
    commands: Mutex<Vec<(String, HeaterCommand)>>,
    echo: Mutex<Option<DeviceStatus>>,
    fail_commands: Mutex<Option<String>>,
    status_delay: Mutex<Duration>,
    status_calls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replying(status: DeviceStatus) -> Self {
        let service = Self::new();
        service.script(Ok(status));
        service
    }

    /// Replaces the script with a single repeating response.
    pub fn script(&self, response: Result<DeviceStatus, &str>) {
        let mut statuses = self.statuses.lock().unwrap();
        statuses.clear();
        statuses.push_back(response.map_err(str::to_string));
    }

    pub fn push(&self, response: Result<DeviceStatus, &str>) {
        self.statuses
            .lock()
            .unwrap()
            .push_back(response.map_err(str::to_string));
    }

    pub fn set_echo(&self, echo: DeviceStatus) {
        *self.echo.lock().unwrap() = Some(echo);
    }

    pub fn fail_commands(&self, reason: &str) {
        *self.fail_commands.lock().unwrap() = Some(reason.to_string());
    }

    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = delay;
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<HeaterCommand> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|(_, c)| *c)
            .collect()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .map(|(a, _)| a.clone())
            .collect()
    }

    fn next_status(&self) -> Result<DeviceStatus, DeviceError> {
        let mut statuses = self.statuses.lock().unwrap();
        let response = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        match response {
            Some(Ok(status)) => Ok(status),
            Some(Err(reason)) => Err(DeviceError::Unavailable(reason)),
            None => Err(DeviceError::Unavailable("no scripted status".to_string())),
        }
    }
}

#[async_trait]
impl HeaterService for ScriptedService {
    async fn status(&self, _address: &str) -> Result<DeviceStatus, DeviceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.status_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.next_status()
    }

    async fn set(&self, address: &str, command: HeaterCommand) -> Result<DeviceStatus, DeviceError> {
        self.commands
            .lock()
            .unwrap()
            .push((address.to_string(), command));
        if let Some(reason) = self.fail_commands.lock().unwrap().clone() {
            return Err(DeviceError::Unavailable(reason));
        }
        Ok(self.echo.lock().unwrap().clone().unwrap_or_default())
    }
}

pub fn reading(celsius: f64, source: &str) -> DeviceStatus {
    DeviceStatus {
        room_current_temp: Some(celsius),
        room_temp_source: Some(source.to_string()),
        ..DeviceStatus::default()
    }
}
