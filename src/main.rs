// src/main.rs - Thermostat host: element tasks plus the platform API
use std::sync::Arc;

use clap::Parser;
use moa_thermostat::{config, web, HttpHeaterService, ThermostatManager};

#[derive(Debug, Parser)]
#[command(name = "moa-thermostat", version, about = "Remote thermostat for MOA Blue radiator elements")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "thermostat.toml")]
    config: String,

    /// Override the platform API listen address
    #[arg(long)]
    listen: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    tracing::info!("Starting MOA thermostat");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Loading configuration from: {}", cli.config);

    let config = config::load_config(&cli.config).map_err(|e| {
        tracing::error!("Failed to load config from '{}': {}", cli.config, e);
        tracing::error!("Please ensure the configuration file exists and is properly formatted");
        Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
    })?;

    tracing::info!("Device service: {}", config.service.base_url);
    tracing::info!(
        "PID: Kp={} Ki={} Kd={}, setpoint {}-{}°C",
        config.control.kp,
        config.control.ki,
        config.control.kd,
        config.control.min_setpoint,
        config.control.max_setpoint
    );

    let service = Arc::new(HttpHeaterService::new(&config.service)?);
    let manager = match ThermostatManager::from_config(&config, service).await {
        Ok(m) => Arc::new(m),
        Err(e) => {
            tracing::error!("Failed to start elements: {}", e);
            return Err(Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>);
        }
    };
    tracing::info!("Managing {} element(s): {}", config.elements.len(), manager.names().await.join(", "));

    let app = web::api::create_router(manager.clone());
    let listen = cli.listen.unwrap_or(config.web.listen);
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!("Platform API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    manager.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
