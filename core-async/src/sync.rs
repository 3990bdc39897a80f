//! Synchronization primitives.
//!
//! Re-exports the async-aware `tokio::sync` types used across the workspace
//! and adds [`Latch`], a one-shot value cell that any number of tasks can
//! await.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, Mutex};
//!
//! # core_async::runtime::block_on(async {
//! let mutex = Mutex::new(0);
//! *mutex.lock().await += 1;
//!
//! let (tx, rx) = watch::channel("starting");
//! tx.send("running").unwrap();
//! assert_eq!(*rx.borrow(), "running");
//! # });
//! ```

pub use tokio::sync::{broadcast, watch, Mutex, OnceCell};

pub use crate::latch::{latch, Latch, LatchSetter};
