//! Engine module contract.
//!
//! The engine is supplied as an opaque module. The host instantiates it with
//! a set of [`HostImports`] and then runs the resulting [`EngineInstance`] as a
//! long-lived background task:
//!
//! ```ignore
//! use bridge_traits::engine::{EngineInstance, EngineModule, HostImports, ModuleInfo};
//! use bridge_traits::envelope::RawEnvelope;
//!
//! struct Echo;
//!
//! impl EngineModule for Echo {
//!     fn info(&self) -> ModuleInfo {
//!         ModuleInfo::new("echo", "0.1.0")
//!     }
//!
//!     fn instantiate(&self, imports: HostImports) -> Result<Box<dyn EngineInstance>> {
//!         Ok(Box::new(EchoInstance { imports }))
//!     }
//! }
//!
//! #[async_trait::async_trait]
//! impl EngineInstance for EchoInstance {
//!     async fn run(self: Box<Self>) -> Result<()> {
//!         let HostImports { mut registrar, .. } = self.imports;
//!         registrar.register_play(|_| RawEnvelope::done());
//!         registrar.ready();
//!         std::future::pending().await
//!     }
//! }
//! ```
//!
//! `run` is expected never to return. The host treats any return, error, or
//! panic as a fatal engine exit.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::envelope::PROTOCOL_VERSION;
use crate::error::Result;
use crate::logging::{LogEntry, LogLevel, LoggerSink};
use crate::registry::Registrar;

/// Identity of an engine module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub version: String,
    /// Calling convention the module implements.
    pub protocol: u32,
}

impl ModuleInfo {
    /// Module info for the current [`PROTOCOL_VERSION`].
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            protocol: PROTOCOL_VERSION,
        }
    }

    pub fn with_protocol(mut self, protocol: u32) -> Self {
        self.protocol = protocol;
        self
    }
}

/// Host console handed to the engine for out-of-band diagnostics.
///
/// Logging is fire-and-forget: inside a runtime the entry is forwarded on a
/// spawned task, outside of one it is delivered before returning.
#[derive(Clone)]
pub struct HostConsole {
    sink: Arc<dyn LoggerSink>,
    target: String,
}

impl HostConsole {
    pub fn new(sink: Arc<dyn LoggerSink>, target: impl Into<String>) -> Self {
        Self {
            sink,
            target: target.into(),
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        if level < self.sink.min_level() {
            return;
        }

        let entry = LogEntry::new(level, self.target.clone(), message);
        let sink = Arc::clone(&self.sink);

        if let Ok(handle) = core_async::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("HostConsole sink error: {}", err);
                }
            });
        } else if let Err(err) = core_async::runtime::block_on(async move { sink.log(entry).await })
        {
            eprintln!("HostConsole sink error: {}", err);
        }
    }
}

impl std::fmt::Debug for HostConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostConsole")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Everything the host provides to a module at instantiation.
#[derive(Debug)]
pub struct HostImports {
    /// Capability registration and readiness signal.
    pub registrar: Registrar,
    /// Diagnostics channel back to the host.
    pub console: HostConsole,
    /// Environment handed to the engine.
    pub env: HashMap<String, String>,
}

/// A loadable engine module.
pub trait EngineModule: Send + Sync {
    fn info(&self) -> ModuleInfo;

    /// Instantiates the module. Errors here are fatal load errors.
    fn instantiate(&self, imports: HostImports) -> Result<Box<dyn EngineInstance>>;
}

/// An instantiated engine, ready to be started.
#[async_trait::async_trait]
pub trait EngineInstance: Send {
    /// Runs the engine. Registers capabilities, signals ready, then keeps
    /// running for the lifetime of the host session.
    async fn run(self: Box<Self>) -> Result<()>;
}
