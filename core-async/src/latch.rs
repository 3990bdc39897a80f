//! One-shot latch.
//!
//! A latch starts unset and is set at most once through its single
//! [`LatchSetter`]. Setting consumes the setter, so a second write cannot be
//! expressed. Every [`Latch`] clone observes the same value.
//!
//! Dropping the setter without setting leaves the latch unset: waiters stay
//! pending forever instead of waking up with nothing. Callers that need to
//! notice an abandoned setter must race the wait against their own signal.

use tokio::sync::watch;

/// Creates a new unset latch and the setter that resolves it.
pub fn latch<T>() -> (LatchSetter<T>, Latch<T>) {
    let (tx, rx) = watch::channel(None);
    (LatchSetter { tx }, Latch { rx })
}

/// Write half of a latch.
pub struct LatchSetter<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> LatchSetter<T> {
    /// Resolves the latch with `value` and wakes every pending waiter.
    pub fn set(self, value: T) {
        self.tx.send_replace(Some(value));
    }
}

impl<T> std::fmt::Debug for LatchSetter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatchSetter").finish_non_exhaustive()
    }
}

/// Read half of a latch. Cheap to clone.
pub struct Latch<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T> Clone for Latch<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Latch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Latch")
            .field("is_set", &self.is_set())
            .finish()
    }
}

impl<T> Latch<T> {
    /// Returns `true` once the latch has been set.
    pub fn is_set(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

impl<T: Clone> Latch<T> {
    /// Returns the value if the latch is already set.
    pub fn try_get(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Waits until the latch is set and returns a clone of its value.
    ///
    /// Dropping the returned future before it resolves releases everything
    /// it registered.
    pub async fn wait(&self) -> T {
        let mut rx = self.rx.clone();
        let value = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|set| (*set).clone());

        match value {
            Some(value) => value,
            // Setter dropped unset.
            None => std::future::pending().await,
        }
    }
}
