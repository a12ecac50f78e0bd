// moa-thermostat: control core for remote MOA Blue radiator elements

pub mod config;
pub mod control;
pub mod device;
pub mod manager;
pub mod scheduler;
pub mod thermostat;
pub mod web;

pub use config::{load_config, Config, ConfigError};
pub use control::{HeaterCommand, HeaterMode};
pub use device::{DeviceError, DeviceStatus, HeaterService, HttpHeaterService};
pub use manager::ThermostatManager;
pub use thermostat::{Thermostat, ThermostatError, ThermostatEvent, ThermostatHandle};
