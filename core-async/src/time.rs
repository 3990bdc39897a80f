//! Time-related helpers.
//!
//! Re-exports Tokio's timer primitives and adds [`bounded`], which applies a
//! timeout only when one is configured. Callers that model "wait forever
//! unless told otherwise" use it instead of branching on the option
//! themselves.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{bounded, sleep, Duration};
//!
//! # core_async::runtime::block_on(async {
//! let unbounded = bounded(None, async { 1 }).await;
//! assert_eq!(unbounded.unwrap(), 1);
//!
//! let expired = bounded(Some(Duration::from_millis(5)), async {
//!     sleep(Duration::from_secs(60)).await;
//! })
//! .await;
//! assert!(expired.is_err());
//! # });
//! ```

pub use tokio::time::{error::Elapsed, sleep, timeout};

pub use std::time::Duration;

/// Awaits `future`, giving up after `limit` when a limit is provided.
///
/// With `limit == None` the future is awaited without any bound.
pub async fn bounded<F>(limit: Option<Duration>, future: F) -> Result<F::Output, Elapsed>
where
    F: std::future::Future,
{
    match limit {
        Some(limit) => timeout(limit, future).await,
        None => Ok(future.await),
    }
}
