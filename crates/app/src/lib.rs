//! `pantry-app`
//!
//! **Responsibility:** process wiring for the `pantry` command-line client.
//!
//! - configuration from the environment
//! - shared state (storage backend, inventory store, scan pipeline)
//! - command execution against that state

pub mod cli;
pub mod commands;
pub mod config;
pub mod settings;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use settings::Preferences;
pub use state::AppState;
