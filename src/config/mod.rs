//! Configuration management
//!
//! Store and wallet locations plus the log filter, read from TOML and the
//! environment.

pub mod settings;

pub use settings::{Config, CONFIG_PATH_ENV, DEFAULT_CONFIG_FILE};
