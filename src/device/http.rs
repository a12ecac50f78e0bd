//! HTTP client for the MOA Blue device-control service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use crate::config::ServiceConfig;
use crate::control::HeaterCommand;
use super::{DeviceError, DeviceStatus, HeaterService};

/// Error body the device service sends with a failed request.
#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// Talks to `GET /status` and `GET /set` on the device service.
#[derive(Debug, Clone)]
pub struct HttpHeaterService {
    client: Client,
    base_url: String,
}

impl HttpHeaterService {
    pub fn new(config: &ServiceConfig) -> Result<Self, DeviceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn with_url(url: impl Into<String>) -> Result<Self, DeviceError> {
        Self::new(&ServiceConfig {
            base_url: url.into(),
            ..ServiceConfig::default()
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn decode(response: Response) -> Result<DeviceStatus, DeviceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // A server-side failure with a plain detail means the device itself could not be reached.
            if status.is_server_error() {
                if let Ok(error) = serde_json::from_str::<ErrorDetail>(&body) {
                    return Err(DeviceError::Unavailable(error.detail));
                }
            }
            return Err(DeviceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl HeaterService for HttpHeaterService {
    async fn status(&self, address: &str) -> Result<DeviceStatus, DeviceError> {
        let url = format!("{}/status", self.base_url);
        tracing::debug!("GET {} address={}", url, address);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn set(&self, address: &str, command: HeaterCommand) -> Result<DeviceStatus, DeviceError> {
        let url = format!("{}/set", self.base_url);
        let mode = command.mode.code().to_string();
        let temp = format!("{:.1}", command.setpoint);
        tracing::debug!("GET {} address={} mode={} temp={}", url, address, mode, temp);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address), ("mode", mode.as_str()), ("temp", temp.as_str())])
            .send()
            .await?;
        let echo = Self::decode(response).await?;
        match echo.error {
            Some(ref reason) => Err(DeviceError::Rejected(reason.clone())),
            None => Ok(echo),
        }
    }
}
