//! Task spawning and join-outcome classification.
//!
//! Spawned tasks run on the ambient Tokio runtime and may move between worker
//! threads, so futures must be `Send + 'static`.
//!
//! Long-running tasks whose completion is itself meaningful (the bridge's
//! engine task is expected to run forever) are awaited through [`join`],
//! which folds the three ways a task can end into a single [`TaskOutcome`].
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::{self, TaskOutcome};
//!
//! # core_async::runtime::block_on(async {
//! let handle = task::spawn(async { 42 });
//! match task::join(handle).await {
//!     TaskOutcome::Completed(value) => assert_eq!(value, 42),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # });
//! ```

pub use tokio::task::{yield_now, AbortHandle, JoinError, JoinHandle};

/// Spawns a new asynchronous task on the current Tokio runtime.
///
/// # Panics
///
/// Panics when called outside of a Tokio runtime.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// How a spawned task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    /// The future ran to completion and produced a value.
    Completed(T),
    /// The future panicked; carries the panic message when it was a string.
    Panicked(String),
    /// The task was aborted or its runtime shut down.
    Cancelled,
}

impl<T> TaskOutcome<T> {
    /// Returns `true` for [`TaskOutcome::Completed`].
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed(_))
    }
}

/// Awaits a task and classifies how it ended.
pub async fn join<T>(handle: JoinHandle<T>) -> TaskOutcome<T> {
    match handle.await {
        Ok(value) => TaskOutcome::Completed(value),
        Err(err) if err.is_panic() => TaskOutcome::Panicked(panic_message(err)),
        Err(_) => TaskOutcome::Cancelled,
    }
}

fn panic_message(err: JoinError) -> String {
    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked with a non-string payload".to_string()
    }
}
