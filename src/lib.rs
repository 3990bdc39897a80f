//! Workspace placeholder crate.
//!
//! Exposes the bridge crates behind a single `bridge` feature so host
//! applications can depend on `balafon-workspace` without wiring each
//! bridge crate individually.

#[cfg(feature = "bridge")]
pub use bridge_traits;
#[cfg(feature = "bridge")]
pub use core_bridge::{self, Balafon, CoreError};
#[cfg(feature = "bridge")]
pub use core_runtime::{self, config::BridgeConfig};
