//! Test support: an in-process RAOP receiver

pub mod mock_raop_server;


pub use mock_raop_server::{MockRaopConfig, MockRaopServer, MockRaopState, MockServerError};
