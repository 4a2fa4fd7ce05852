//! Configuration models and file loading for loresmith.
//!
//! This crate owns the config schema, defaults, and `loresmith.json5`
//! discovery used by the CLI and SDK.

mod error;
mod loader;
mod model;

/// Public error type returned by config loading APIs.
pub use error::ConfigError;
/// Discovery options and load entry points.
pub use loader::{LoadOptions, default_preset_path, load_config};
/// Configuration schema models.
pub use model::*;
