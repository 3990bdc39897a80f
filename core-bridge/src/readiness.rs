//! # Readiness Barrier
//!
//! Gates the first capability call until the engine has finished
//! registering.
//!
//! The barrier resolves exactly once, when the engine calls
//! [`Registrar::ready`](bridge_traits::Registrar::ready). It does not poll and
//! makes no timing assumptions. Two things end the wait early:
//! - the engine task exits first (it can never signal anymore)
//! - the optional readiness timeout elapses
//!
//! Without a timeout the wait is unbounded for as long as the engine runs.

use bridge_traits::CapabilitySet;
use core_async::sync::{watch, Latch};
use core_async::time::{self, Duration};
use tracing::{debug, warn};

use crate::error::{CoreError, Result};
use crate::loader::{wait_for_exit, EngineStatus};

/// One-shot gate on the engine's readiness signal.
#[derive(Debug, Clone)]
pub struct ReadinessBarrier {
    ready: Latch<CapabilitySet>,
    status: watch::Receiver<EngineStatus>,
    timeout: Option<Duration>,
}

impl ReadinessBarrier {
    pub fn new(ready: Latch<CapabilitySet>, status: watch::Receiver<EngineStatus>) -> Self {
        Self {
            ready,
            status,
            timeout: None,
        }
    }

    /// Bounds [`wait`](Self::wait); `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the engine has signalled readiness.
    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    /// Waits for the engine's capabilities.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EngineExited`] if the engine ends before signalling
    /// - [`CoreError::ReadinessTimeout`] if the configured timeout elapses
    pub async fn wait(self) -> Result<CapabilitySet> {
        let ReadinessBarrier {
            ready,
            status,
            timeout,
        } = self;

        let signal = async {
            core_async::select! {
                biased;
                capabilities = ready.wait() => Ok(capabilities),
                exit = wait_for_exit(status) => Err(CoreError::EngineExited(exit.to_string())),
            }
        };

        match time::bounded(timeout, signal).await {
            Ok(Ok(capabilities)) => {
                debug!(capabilities = ?capabilities.registered(), "Engine signalled readiness");
                Ok(capabilities)
            }
            Ok(Err(err)) => {
                warn!("Engine exited before signalling readiness: {}", err);
                Err(err)
            }
            Err(_) => {
                let limit = timeout.unwrap_or_default();
                warn!(timeout = ?limit, "Engine did not signal readiness in time");
                Err(CoreError::ReadinessTimeout(limit))
            }
        }
    }
}
