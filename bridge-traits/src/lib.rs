//! # Engine Bridge Traits
//!
//! The contract between the host-side bridge (`core-bridge`) and an engine
//! module that compiles balafon notation and drives MIDI output.
//!
//! ## Overview
//!
//! The engine itself is out of scope for this workspace; it is supplied as an
//! opaque [`EngineModule`](engine::EngineModule). This crate fixes what both
//! sides agree on:
//!
//! - [`engine`] - module identity, host imports, and the long-running
//!   [`EngineInstance`](engine::EngineInstance)
//! - [`registry`] - per-instance capability registration and the one-shot
//!   readiness signal
//! - [`envelope`] - the protocol v3 response envelope and its payloads
//!   ([`Position`](envelope::Position), [`Port`](envelope::Port))
//! - [`logging`] - structured log entries and the [`LoggerSink`](logging::LoggerSink)
//!   used for the host console
//!
//! ## Registration lifecycle
//!
//! ```text
//! host                         engine
//!  │ instantiate(HostImports) ──▶│
//!  │ spawn(run)                  │ register_convert / register_play ...
//!  │ await latch ◀───────────────│ registrar.ready()
//!  │ call capabilities ─────────▶│ (runs until the host session ends)
//! ```
//!
//! ## Thread Safety
//!
//! Capability functions are `Send + Sync` and may be invoked from any host
//! thread. The host serializes calls, so an engine does not need to make its
//! capabilities reentrant.

pub mod engine;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod registry;

pub use error::BridgeError;

// Re-export commonly used types
pub use engine::{EngineInstance, EngineModule, HostConsole, HostImports, ModuleInfo};
pub use envelope::{
    ConvertPayload, Empty, Port, PortsPayload, Position, RawEnvelope, PROTOCOL_VERSION,
};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use registry::{Capability, CapabilitySet, Registrar};
