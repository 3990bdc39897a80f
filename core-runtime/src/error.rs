//! Errors raised while configuring the bridge runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value is out of range.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The builder was finished without an engine module.
    #[error("No engine module provided. Use .module() to supply the engine the bridge should load")]
    ModuleMissing,

    #[error("Invalid log filter '{filter}': {message}")]
    InvalidLogFilter { filter: String, message: String },

    /// A global subscriber is already installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),
}

pub type Result<T> = std::result::Result<T, Error>;
