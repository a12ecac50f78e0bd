//! The web module exposing the thermostat contract over an Axum API.
//! This file declares the other files in this directory as sub-modules.

pub mod api;
pub mod models;
