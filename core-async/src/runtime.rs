//! Executor handles.
//!
//! Downstream crates use [`Handle::try_current`] to find out whether they are
//! already running inside an executor, and [`block_on`] for the few places
//! (examples, synchronous tests, logging sinks outside a runtime) that need to
//! drive a future from synchronous code.

pub use tokio::runtime::{Builder, Handle};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if called from inside an existing runtime, or if the runtime cannot
/// be built.
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

/// Returns `true` when the caller is running inside a Tokio runtime.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_drives_future() {
        assert_eq!(block_on(async { 21 * 2 }), 42);
    }

    #[test]
    fn in_runtime_reports_context() {
        assert!(!in_runtime());
        assert!(block_on(async { in_runtime() }));
    }
}
