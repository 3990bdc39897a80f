//! # Core Bridge
//!
//! Host side of the balafon engine bridge: loads an engine module, waits for
//! it to become ready, and exposes its capabilities as a typed async API.
//!
//! ## Components
//!
//! - [`loader`] - instantiates the engine and supervises its task
//! - [`readiness`] - one-shot barrier on the engine's ready signal
//! - [`envelope`] - normalizes response envelopes into typed results
//! - [`buffer`] - host-owned output buffer for `convert`
//! - [`facade`] - [`Balafon`], the surface hosts call
//!
//! ## Lifecycle
//!
//! ```text
//! BridgeConfig ─▶ Balafon::new ─▶ init() ─▶ EngineLoader::load ─▶ spawn engine
//!                                    │                               │
//!                                    └── ReadinessBarrier::wait ◀── registrar.ready()
//!                                                 │
//!                        convert / list_ports / select_port / play
//! ```
//!
//! Load failures, readiness timeouts, and engine exits are fatal for the
//! instance ([`CoreError::is_fatal`]). Operation errors reported by the engine
//! are recoverable and leave the bridge usable.

pub mod buffer;
pub mod envelope;
pub mod error;
pub mod facade;
pub mod loader;
pub mod readiness;

pub use buffer::OutputBuffer;
pub use envelope::{decode_json, normalize, normalize_convert, Converted};
pub use error::{CoreError, OperationError, Result};
pub use facade::Balafon;
pub use loader::{
    BridgeInstanceId, EngineExit, EngineLoader, EngineStatus, HostBindings, LoadedEngine,
};
pub use readiness::ReadinessBarrier;
