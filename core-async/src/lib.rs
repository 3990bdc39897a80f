//! Async primitives shared by the balafon bridge crates.
//!
//! The bridge crates never depend on Tokio directly for spawning, timing, or
//! synchronization; they go through this crate so the executor choice lives
//! in one place.
//!
//! # Modules
//!
//! - `runtime`: executor handles and a blocking entry point
//! - `task`: task spawning and join-outcome classification
//! - `time`: sleeps, timeouts, and optionally bounded waits
//! - `sync`: channels, locks, and the one-shot [`Latch`](sync::Latch)
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::latch;
//! use core_async::task;
//!
//! # core_async::runtime::block_on(async {
//! let (setter, ready) = latch::<u32>();
//!
//! task::spawn(async move {
//!     setter.set(7);
//! });
//!
//! assert_eq!(ready.wait().await, 7);
//! # });
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

mod latch;

// Re-export the combinator macros so downstream crates never need a direct
// Tokio dependency.
pub use tokio::{join, select};

pub use task::spawn;
pub use time::{sleep, Duration};
