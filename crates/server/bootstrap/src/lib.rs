//! Shared bootstrap utilities for the game server.
//!
//! Loads deployment configuration from the environment and assembles a
//! [`runtime::Runtime`] over file-backed storage.
pub mod builder;
pub mod config;

pub use builder::{ServerBuilder, ServerSetup};
pub use config::{InstanceConfig, ServerConfig};
