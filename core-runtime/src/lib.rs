//! # Core Runtime Module
//!
//! Ambient runtime infrastructure for the balafon bridge:
//! - Logging and tracing infrastructure
//! - Bridge configuration
//! - Event bus for engine lifecycle and operation events
//!
//! ## Overview
//!
//! `core-bridge` depends on this crate for everything that is not the bridge
//! protocol itself: how it logs, how it is configured, and how it tells the
//! host what happened.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
