// src/manager.rs - Registry of managed heating elements
use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::config::{Config, ConfigError, ControlConfig, ElementConfig};
use crate::device::HeaterService;
use crate::thermostat::{Thermostat, ThermostatError, ThermostatHandle, ThermostatSnapshot};

struct Element {
    handle: ThermostatHandle,
    task: JoinHandle<()>,
}

/// Starts, looks up and tears down element tasks.
///
/// Elements share nothing but the device service client; each one runs on
/// its own task with its own state.
pub struct ThermostatManager {
    control: ControlConfig,
    service: Arc<dyn HeaterService>,
    elements: RwLock<BTreeMap<String, Element>>,
}

impl ThermostatManager {
    pub fn new(control: ControlConfig, service: Arc<dyn HeaterService>) -> Self {
        Self {
            control,
            service,
            elements: RwLock::new(BTreeMap::new()),
        }
    }

    /// Validates the whole config, then starts one task per element.
    pub async fn from_config(
        config: &Config,
        service: Arc<dyn HeaterService>,
    ) -> Result<Self, ThermostatError> {
        config.validate()?;
        let manager = Self::new(config.control.clone(), service);
        for element in &config.elements {
            manager.add(element).await?;
        }
        Ok(manager)
    }

    pub async fn add(&self, element: &ElementConfig) -> Result<ThermostatHandle, ThermostatError> {
        let mut elements = self.elements.write().await;
        if elements.contains_key(&element.name) {
            return Err(ConfigError::DuplicateElement(element.name.clone()).into());
        }
        let (handle, task) = Thermostat::spawn(element, &self.control, self.service.clone())?;
        tracing::info!("Added element '{}'", element.name);
        elements.insert(
            element.name.clone(),
            Element {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    /// Stops the element's task and waits for it, cancelling its pending resample.
    pub async fn remove(&self, name: &str) -> Result<(), ThermostatError> {
        let element = self
            .elements
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ThermostatError::UnknownElement(name.to_string()))?;
        element.handle.shutdown().await;
        if let Err(e) = element.task.await {
            tracing::error!("Element '{}' task ended abnormally: {}", name, e);
        }
        tracing::info!("Removed element '{}'", name);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<ThermostatHandle, ThermostatError> {
        self.elements
            .read()
            .await
            .get(name)
            .map(|e| e.handle.clone())
            .ok_or_else(|| ThermostatError::UnknownElement(name.to_string()))
    }

    pub async fn names(&self) -> Vec<String> {
        self.elements.read().await.keys().cloned().collect()
    }

    /// Snapshots of every running element, skipping any whose task has stopped.
    pub async fn snapshots(&self) -> Vec<ThermostatSnapshot> {
        let handles: Vec<ThermostatHandle> = self
            .elements
            .read()
            .await
            .values()
            .map(|e| e.handle.clone())
            .collect();
        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.snapshot().await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => tracing::warn!("Element '{}' unavailable: {}", handle.name(), e),
            }
        }
        snapshots
    }

    pub async fn shutdown(&self) {
        tracing::info!("Shutting down all elements");
        let names = self.names().await;
        for name in names {
            if let Err(e) = self.remove(&name).await {
                tracing::warn!("Failed to stop element '{}': {}", name, e);
            }
        }
    }
}
