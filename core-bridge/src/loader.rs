//! # Engine Loader
//!
//! Instantiates an [`EngineModule`] and runs it as a supervised background
//! task.
//!
//! ## Overview
//!
//! Loading is a single, fatal-on-failure step:
//! 1. Check the module's protocol version
//! 2. Create the readiness latch and the [`Registrar`] bound to it
//! 3. Build [`HostImports`] from the [`HostBindings`]
//! 4. Instantiate the module
//! 5. Spawn the engine task plus a supervisor awaiting it
//!
//! The engine is expected to run for the lifetime of the bridge. The
//! supervisor turns any completion (return, error, panic, abort) into
//! [`EngineStatus::Exited`] on a `watch` channel and a
//! [`BridgeEvent::EngineExited`] on the event bus. There is no restart.
//!
//! Dropping the [`LoadedEngine`] aborts the engine task.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{
    CapabilitySet, ConsoleLogger, EngineModule, HostConsole, HostImports, LoggerSink, ModuleInfo,
    Registrar, PROTOCOL_VERSION,
};
use core_async::runtime;
use core_async::sync::{watch, Latch};
use core_async::task::{self, AbortHandle, TaskOutcome};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{BridgeEvent, EventBus};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::readiness::ReadinessBarrier;

/// Unique identifier of one loaded engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeInstanceId(Uuid);

impl BridgeInstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for BridgeInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BridgeInstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the engine task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineExit {
    /// `run` returned `Ok(())`.
    Returned,
    /// `run` returned an error.
    Failed(String),
    /// The engine task panicked.
    Panicked(String),
    /// The engine task was aborted or its runtime shut down.
    Cancelled,
}

impl fmt::Display for EngineExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineExit::Returned => f.write_str("engine returned"),
            EngineExit::Failed(message) => write!(f, "engine failed: {}", message),
            EngineExit::Panicked(message) => write!(f, "engine panicked: {}", message),
            EngineExit::Cancelled => f.write_str("engine task cancelled"),
        }
    }
}

/// Liveness of the engine task as published by its supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Running,
    Exited(EngineExit),
}

impl EngineStatus {
    pub fn is_exited(&self) -> bool {
        matches!(self, EngineStatus::Exited(_))
    }

    pub fn exit(&self) -> Option<&EngineExit> {
        match self {
            EngineStatus::Running => None,
            EngineStatus::Exited(exit) => Some(exit),
        }
    }
}

/// What the host hands to the engine besides the registrar.
#[derive(Clone)]
pub struct HostBindings {
    /// Sink receiving engine console output.
    pub console: Arc<dyn LoggerSink>,
    /// Environment visible to the engine.
    pub env: HashMap<String, String>,
}

impl HostBindings {
    pub fn new(console: Arc<dyn LoggerSink>) -> Self {
        Self {
            console,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            console: Arc::clone(&config.console_sink),
            env: config.engine_env.clone(),
        }
    }
}

impl Default for HostBindings {
    fn default() -> Self {
        Self::new(Arc::new(ConsoleLogger::default()))
    }
}

impl fmt::Debug for HostBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBindings")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Loads engine modules.
pub struct EngineLoader {
    module: Arc<dyn EngineModule>,
    events: EventBus,
}

impl EngineLoader {
    pub fn new(module: Arc<dyn EngineModule>, events: EventBus) -> Self {
        Self { module, events }
    }

    /// Instantiates the module and starts the engine task.
    ///
    /// Must be called from within a runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Load`] if the module speaks another protocol
    /// version or fails to instantiate, and [`CoreError::Internal`] outside a
    /// runtime. Load errors are never retried.
    #[instrument(skip(self, host), fields(module = tracing::field::Empty))]
    pub fn load(&self, host: HostBindings) -> Result<LoadedEngine> {
        let info = self.module.info();
        tracing::Span::current().record("module", info.name.as_str());

        if info.protocol != PROTOCOL_VERSION {
            error!(
                protocol = info.protocol,
                expected = PROTOCOL_VERSION,
                "Engine module speaks an unsupported protocol"
            );
            return Err(CoreError::Load(format!(
                "module {} {} implements protocol {}, expected {}",
                info.name, info.version, info.protocol, PROTOCOL_VERSION
            )));
        }

        if !runtime::in_runtime() {
            return Err(CoreError::Internal(
                "engine must be loaded from within an async runtime".to_string(),
            ));
        }

        let (registrar, ready) = Registrar::new();
        let imports = HostImports {
            registrar,
            console: HostConsole::new(host.console, format!("engine::{}", info.name)),
            env: host.env,
        };

        let instance = self.module.instantiate(imports).map_err(|err| {
            error!("Engine instantiation failed: {}", err);
            CoreError::Load(format!("failed to instantiate {}: {}", info.name, err))
        })?;

        let id = BridgeInstanceId::new();
        let (status_tx, status) = watch::channel(EngineStatus::Running);

        let engine = task::spawn(async move { instance.run().await });
        let abort = engine.abort_handle();

        let events = self.events.clone();
        task::spawn(async move {
            let exit = match task::join(engine).await {
                TaskOutcome::Completed(Ok(())) => EngineExit::Returned,
                TaskOutcome::Completed(Err(err)) => EngineExit::Failed(err.to_string()),
                TaskOutcome::Panicked(message) => EngineExit::Panicked(message),
                TaskOutcome::Cancelled => EngineExit::Cancelled,
            };

            if exit == EngineExit::Cancelled {
                debug!(instance = %id, "Engine task aborted");
            } else {
                error!(instance = %id, reason = %exit, "Engine exited");
            }

            status_tx.send_replace(EngineStatus::Exited(exit.clone()));
            events
                .emit(BridgeEvent::EngineExited {
                    instance: id.as_uuid(),
                    reason: exit.to_string(),
                })
                .ok();
        });

        info!(instance = %id, version = %info.version, "Engine module loaded");
        self.events
            .emit(BridgeEvent::EngineLoaded {
                instance: id.as_uuid(),
                module: info.name.clone(),
                version: info.version.clone(),
            })
            .ok();

        Ok(LoadedEngine {
            id,
            info,
            ready,
            status,
            abort,
        })
    }
}

/// A running engine owned by the bridge.
pub struct LoadedEngine {
    id: BridgeInstanceId,
    info: ModuleInfo,
    ready: Latch<CapabilitySet>,
    status: watch::Receiver<EngineStatus>,
    abort: AbortHandle,
}

impl LoadedEngine {
    pub fn id(&self) -> BridgeInstanceId {
        self.id
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    /// Current engine status.
    pub fn status(&self) -> EngineStatus {
        self.status.borrow().clone()
    }

    /// How the engine ended, if it has.
    pub fn exit(&self) -> Option<EngineExit> {
        self.status.borrow().exit().cloned()
    }

    /// Waits until the engine task ends.
    pub async fn wait_exit(&self) -> EngineExit {
        wait_for_exit(self.status.clone()).await
    }

    /// Barrier resolving once the engine signals readiness.
    pub fn readiness(&self) -> ReadinessBarrier {
        ReadinessBarrier::new(self.ready.clone(), self.status.clone())
    }

    /// Aborts the engine task. The supervisor still publishes the exit.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

impl Drop for LoadedEngine {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

impl fmt::Debug for LoadedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedEngine")
            .field("id", &self.id)
            .field("info", &self.info)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

pub(crate) async fn wait_for_exit(mut status: watch::Receiver<EngineStatus>) -> EngineExit {
    match status.wait_for(EngineStatus::is_exited).await {
        Ok(status) => status.exit().cloned().unwrap_or(EngineExit::Cancelled),
        // Supervisor gone without publishing: its runtime shut down.
        Err(_) => EngineExit::Cancelled,
    }
}
