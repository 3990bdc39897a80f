use bridge_traits::{Capability, Position};
use core_async::time::Duration;
use std::fmt;
use thiserror::Error;

/// A capability reported failure through its envelope.
///
/// Recoverable: the bridge stays usable after an operation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub capability: Capability,
    pub message: String,
    /// Only set for `convert`.
    pub position: Option<Position>,
}

impl OperationError {
    pub fn new(capability: Capability, message: impl Into<String>) -> Self {
        Self {
            capability,
            message: message.into(),
            position: None,
        }
    }

    pub fn with_position(mut self, position: Option<Position>) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.capability, self.message)?;
        if let Some(position) = self.position {
            write!(f, " at {}", position)?;
        }
        Ok(())
    }
}

impl std::error::Error for OperationError {}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Engine load failed: {0}")]
    Load(String),

    #[error("Engine did not signal readiness within {0:?}")]
    ReadinessTimeout(Duration),

    #[error("Engine exited: {0}")]
    EngineExited(String),

    #[error("Bridge not initialized; call init() first")]
    NotInitialized,

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Capability not registered by the engine: {0}")]
    CapabilityUnavailable(Capability),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Output buffer too small: {required} bytes required, capacity is {capacity}")]
    BufferTooSmall { required: usize, capacity: usize },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Fatal errors end the bridge instance; everything else is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::Load(_) | CoreError::ReadinessTimeout(_) | CoreError::EngineExited(_)
        )
    }

    /// Source position attached to a failed conversion.
    pub fn position(&self) -> Option<Position> {
        match self {
            CoreError::Operation(err) => err.position,
            _ => None,
        }
    }
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::Config(message) => CoreError::Config(message),
            other => CoreError::Config(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
