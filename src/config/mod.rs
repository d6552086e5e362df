//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, FsmSettings, LoggingConfig)
//! - [`validation`]: Checks run after parsing
//! - `defaults`: serde default functions

mod defaults;
mod types;
mod validation;

pub use types::{Config, FsmSettings, LoggingConfig};
pub use validation::{ValidationError, validate};
