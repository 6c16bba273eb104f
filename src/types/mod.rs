//! Core types: client configuration and receiver targets

mod config;
mod target;

pub use config::{RaopConfig, RaopConfigBuilder};
pub use target::RaopTarget;
