//! # Bridge Event Bus
//!
//! Broadcasts lifecycle and operation events of bridge instances using
//! `broadcast` channels from `core-async`.
//!
//! ## Overview
//!
//! The façade emits a [`BridgeEvent`] at every lifecycle transition of its
//! engine (loaded, ready, exited) and for the operations a UI typically
//! mirrors (port selection, playback start, conversion failure). Hosts
//! subscribe to keep status displays in sync without polling the bridge.
//!
//! ```text
//! ┌──────────┐   emit    ┌──────────┐   subscribe   ┌────────────┐
//! │ Balafon  ├──────────▶│ EventBus ├──────────────▶│ Subscriber │
//! └──────────┘           └──────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{BridgeEvent, EventBus};
//! use uuid::Uuid;
//!
//! # core_async::runtime::block_on(async {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(BridgeEvent::PortSelected { instance: Uuid::nil(), number: 1 }).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Output port selected");
//! # });
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events; it can keep receiving.
//! - **`RecvError::Closed`**: every sender is gone; the bridge was dropped.
//!
//! Emitting with no subscribers returns an error that callers ignore: events
//! are advisory.

use bridge_traits::{Capability, Position};
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Event emitted by a bridge instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    /// The engine module was instantiated and its task started.
    EngineLoaded {
        instance: Uuid,
        module: String,
        version: String,
    },
    /// The engine signalled readiness; capabilities are captured.
    EngineReady {
        instance: Uuid,
        capabilities: Vec<Capability>,
    },
    /// The engine task terminated. Always fatal for the instance.
    EngineExited { instance: Uuid, reason: String },
    /// The engine accepted a new output port.
    PortSelected { instance: Uuid, number: u32 },
    /// The engine accepted a playback request.
    PlaybackStarted { instance: Uuid, fresh_source: bool },
    /// A conversion failed with a diagnostic.
    ConversionFailed {
        instance: Uuid,
        message: String,
        position: Option<Position>,
    },
}

impl BridgeEvent {
    /// Bridge instance that emitted the event.
    pub fn instance(&self) -> Uuid {
        match self {
            BridgeEvent::EngineLoaded { instance, .. }
            | BridgeEvent::EngineReady { instance, .. }
            | BridgeEvent::EngineExited { instance, .. }
            | BridgeEvent::PortSelected { instance, .. }
            | BridgeEvent::PlaybackStarted { instance, .. }
            | BridgeEvent::ConversionFailed { instance, .. } => *instance,
        }
    }

    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &'static str {
        match self {
            BridgeEvent::EngineLoaded { .. } => "Engine module loaded",
            BridgeEvent::EngineReady { .. } => "Engine ready",
            BridgeEvent::EngineExited { .. } => "Engine exited",
            BridgeEvent::PortSelected { .. } => "Output port selected",
            BridgeEvent::PlaybackStarted { .. } => "Playback started",
            BridgeEvent::ConversionFailed { .. } => "Conversion failed",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::EngineExited { .. } => EventSeverity::Error,
            BridgeEvent::ConversionFailed { .. } => EventSeverity::Warning,
            BridgeEvent::EngineLoaded { .. } | BridgeEvent::EngineReady { .. } => {
                EventSeverity::Info
            }
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Broadcast hub for [`BridgeEvent`]s. Clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{BridgeEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(16);
/// let errors = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing
    /// matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }

    fn matches(&self, event: &BridgeEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
