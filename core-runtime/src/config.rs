//! # Bridge Configuration Module
//!
//! Provides configuration management for a balafon bridge instance.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`BridgeConfig`] holding the engine module, the host bindings handed to it,
//! and the limits the façade enforces. It validates fail-fast so a bridge never
//! starts with an engine it cannot load or a buffer it cannot allocate.
//!
//! ## Required Dependencies
//!
//! - [`EngineModule`] - the engine to load
//!
//! ## Optional Settings (with defaults)
//!
//! - console sink - where engine diagnostics go (default: [`ConsoleLogger`])
//! - engine environment - key/value pairs handed to the engine (default: empty)
//! - readiness timeout - bound on the wait for the engine (default: none)
//! - initial buffer capacity - [`DEFAULT_INITIAL_BUFFER_CAPACITY`]
//! - maximum buffer capacity - [`DEFAULT_MAX_BUFFER_CAPACITY`]
//! - required capabilities - checked at init (default: none)
//! - event buffer size - [`DEFAULT_EVENT_BUFFER_SIZE`]
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_traits::Capability;
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = BridgeConfig::builder()
//!     .module(Arc::new(MyEngine))
//!     .readiness_timeout(Duration::from_secs(5))
//!     .require_capability(Capability::Convert)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::BridgeConfig;
//!
//! // No engine module
//! let config = BridgeConfig::builder()
//!     .build()
//!     .expect("Should fail - missing engine module");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Capability, ConsoleLogger, EngineModule, LoggerSink};
use core_async::time::Duration;
use std::collections::HashMap;
use std::sync::Arc;

/// Default size of the conversion output buffer.
pub const DEFAULT_INITIAL_BUFFER_CAPACITY: usize = 4096;

/// Default upper bound for output buffer growth.
pub const DEFAULT_MAX_BUFFER_CAPACITY: usize = 16 * 1024 * 1024;

/// Hard ceiling for any configured buffer capacity.
pub const MAX_BUFFER_CAPACITY_LIMIT: usize = 256 * 1024 * 1024;

/// Configuration of one bridge instance.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Engine module to load (required)
    pub module: Arc<dyn EngineModule>,

    /// Console the engine writes diagnostics to
    pub console_sink: Arc<dyn LoggerSink>,

    /// Environment handed to the engine at instantiation
    pub engine_env: HashMap<String, String>,

    /// Bound on the wait for engine readiness; `None` waits forever
    pub readiness_timeout: Option<Duration>,

    /// Capacity of freshly created output buffers, in bytes
    pub initial_buffer_capacity: usize,

    /// Largest capacity an output buffer may grow to, in bytes
    pub max_buffer_capacity: usize,

    /// Capabilities the engine must register for init to succeed
    pub required_capabilities: Vec<Capability>,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("module", &self.module.info())
            .field("engine_env", &self.engine_env.keys().collect::<Vec<_>>())
            .field("readiness_timeout", &self.readiness_timeout)
            .field("initial_buffer_capacity", &self.initial_buffer_capacity)
            .field("max_buffer_capacity", &self.max_buffer_capacity)
            .field("required_capabilities", &self.required_capabilities)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

impl BridgeConfig {
    /// Create a new configuration builder.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for out-of-range limits.
    pub fn validate(&self) -> Result<()> {
        if self.initial_buffer_capacity == 0 {
            return Err(Error::Config(
                "Initial buffer capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_buffer_capacity > MAX_BUFFER_CAPACITY_LIMIT {
            return Err(Error::Config(format!(
                "Maximum buffer capacity must not exceed {} bytes (got {})",
                MAX_BUFFER_CAPACITY_LIMIT, self.max_buffer_capacity
            )));
        }

        if self.initial_buffer_capacity > self.max_buffer_capacity {
            return Err(Error::Config(format!(
                "Initial buffer capacity ({}) exceeds maximum buffer capacity ({})",
                self.initial_buffer_capacity, self.max_buffer_capacity
            )));
        }

        if self.readiness_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Readiness timeout must be greater than 0 when set".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Default)]
pub struct BridgeConfigBuilder {
    module: Option<Arc<dyn EngineModule>>,
    console_sink: Option<Arc<dyn LoggerSink>>,
    engine_env: HashMap<String, String>,
    readiness_timeout: Option<Duration>,
    initial_buffer_capacity: Option<usize>,
    max_buffer_capacity: Option<usize>,
    required_capabilities: Vec<Capability>,
    event_buffer_size: Option<usize>,
}

impl BridgeConfigBuilder {
    /// Set the engine module (required).
    pub fn module(mut self, module: Arc<dyn EngineModule>) -> Self {
        self.module = Some(module);
        self
    }

    /// Set the sink receiving engine console output.
    pub fn console_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.console_sink = Some(sink);
        self
    }

    /// Add one environment variable for the engine.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.engine_env.insert(key.into(), value.into());
        self
    }

    /// Add several environment variables for the engine.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.engine_env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Bound the wait for engine readiness.
    pub fn readiness_timeout(mut self, timeout: Duration) -> Self {
        self.readiness_timeout = Some(timeout);
        self
    }

    /// Set the initial output buffer capacity in bytes.
    pub fn initial_buffer_capacity(mut self, capacity: usize) -> Self {
        self.initial_buffer_capacity = Some(capacity);
        self
    }

    /// Set the maximum output buffer capacity in bytes.
    pub fn max_buffer_capacity(mut self, capacity: usize) -> Self {
        self.max_buffer_capacity = Some(capacity);
        self
    }

    /// Require `capability` to be registered by the engine.
    pub fn require_capability(mut self, capability: Capability) -> Self {
        if !self.required_capabilities.contains(&capability) {
            self.required_capabilities.push(capability);
        }
        self
    }

    /// Require every capability in `capabilities`.
    pub fn required_capabilities(
        self,
        capabilities: impl IntoIterator<Item = Capability>,
    ) -> Self {
        capabilities
            .into_iter()
            .fold(self, |builder, capability| builder.require_capability(capability))
    }

    /// Set the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::ModuleMissing`] when no engine module was provided
    /// - [`Error::Config`] when a limit is out of range
    pub fn build(self) -> Result<BridgeConfig> {
        let module = self.module.ok_or(Error::ModuleMissing)?;

        let config = BridgeConfig {
            module,
            console_sink: self
                .console_sink
                .unwrap_or_else(|| Arc::new(ConsoleLogger::default())),
            engine_env: self.engine_env,
            readiness_timeout: self.readiness_timeout,
            initial_buffer_capacity: self
                .initial_buffer_capacity
                .unwrap_or(DEFAULT_INITIAL_BUFFER_CAPACITY),
            max_buffer_capacity: self
                .max_buffer_capacity
                .unwrap_or(DEFAULT_MAX_BUFFER_CAPACITY),
            required_capabilities: self.required_capabilities,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{BridgeError, EngineInstance, HostImports, ModuleInfo};

    struct NullModule;

    impl EngineModule for NullModule {
        fn info(&self) -> ModuleInfo {
            ModuleInfo::new("null", "0.0.0")
        }

        fn instantiate(
            &self,
            _imports: HostImports,
        ) -> bridge_traits::error::Result<Box<dyn EngineInstance>> {
            Err(BridgeError::NotAvailable("null engine".to_string()))
        }
    }

    fn builder() -> BridgeConfigBuilder {
        BridgeConfig::builder().module(Arc::new(NullModule))
    }

    #[test]
    fn test_builder_applies_defaults() {
        let config = builder().build().unwrap();

        assert_eq!(config.initial_buffer_capacity, DEFAULT_INITIAL_BUFFER_CAPACITY);
        assert_eq!(config.max_buffer_capacity, DEFAULT_MAX_BUFFER_CAPACITY);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert!(config.readiness_timeout.is_none());
        assert!(config.required_capabilities.is_empty());
        assert!(config.engine_env.is_empty());
        assert_eq!(config.module.info().name, "null");
    }

    #[test]
    fn test_builder_requires_module() {
        let result = BridgeConfig::builder().build();
        match result {
            Err(err @ Error::ModuleMissing) => assert!(err.to_string().contains(".module()")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_builder_collects_env_and_capabilities() {
        let config = builder()
            .env("BALAFON_TEMPO", "120")
            .envs([("A", "1"), ("B", "2")])
            .require_capability(Capability::Convert)
            .required_capabilities([Capability::Convert, Capability::Play])
            .readiness_timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        assert_eq!(config.engine_env.len(), 3);
        assert_eq!(config.engine_env["BALAFON_TEMPO"], "120");
        assert_eq!(
            config.required_capabilities,
            vec![Capability::Convert, Capability::Play]
        );
        assert_eq!(config.readiness_timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_validate_rejects_zero_initial_capacity() {
        let result = builder().initial_buffer_capacity(0).build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("greater than 0")));
    }

    #[test]
    fn test_validate_rejects_initial_above_max() {
        let result = builder()
            .initial_buffer_capacity(8192)
            .max_buffer_capacity(4096)
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("exceeds")));
    }

    #[test]
    fn test_validate_rejects_excessive_max_capacity() {
        let result = builder()
            .max_buffer_capacity(MAX_BUFFER_CAPACITY_LIMIT + 1)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout_and_event_buffer() {
        assert!(matches!(
            builder().readiness_timeout(Duration::ZERO).build(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            builder().event_buffer_size(0).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_debug_lists_module_not_sink() {
        let config = builder().env("SECRET_PATH", "/tmp").build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("null"));
        assert!(debug.contains("SECRET_PATH"));
        assert!(!debug.contains("/tmp"));
    }
}
