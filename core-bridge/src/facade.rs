//! # Balafon Façade
//!
//! The typed host surface over a loaded engine.
//!
//! ## Overview
//!
//! [`Balafon`] owns one engine instance for its whole lifetime:
//! - `init` loads the engine, waits for readiness, and captures the
//!   registered capabilities; it runs at most once successfully
//! - every capability call checks, in order: initialized, engine alive,
//!   capability registered
//! - calls are serialized through a fair dispatch gate so they reach the
//!   engine in issue order
//! - envelopes are normalized into typed results or [`CoreError`]s
//!
//! ## Usage
//!
//! ```ignore
//! use core_bridge::Balafon;
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder().module(Arc::new(MyEngine)).build()?;
//! let balafon = Balafon::new(config);
//! balafon.init().await?;
//!
//! let mut buffer = balafon.output_buffer();
//! let converted = balafon.convert(&mut buffer, ":assign c 60").await?;
//! println!("{} bytes of MIDI", converted.written);
//!
//! for port in balafon.list_ports().await? {
//!     println!("{}", port);
//! }
//! balafon.select_port(1).await?;
//! balafon.play(Some("c d e")).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use bridge_traits::{Capability, CapabilitySet, Port};
use core_async::sync::{Mutex, OnceCell};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{BridgeEvent, EventBus, Receiver};
use tracing::{debug, info, instrument, warn};

use crate::buffer::OutputBuffer;
use crate::envelope::{normalize, normalize_convert, Converted};
use crate::error::{CoreError, Result};
use crate::loader::{BridgeInstanceId, EngineLoader, EngineStatus, HostBindings, LoadedEngine};

struct Session {
    engine: LoadedEngine,
    capabilities: CapabilitySet,
}

impl Session {
    fn capability<F: Clone>(
        &self,
        capability: Capability,
        pick: impl FnOnce(&CapabilitySet) -> Option<&F>,
    ) -> Result<F> {
        pick(&self.capabilities)
            .cloned()
            .ok_or(CoreError::CapabilityUnavailable(capability))
    }
}

/// Host-side bridge to one engine instance.
pub struct Balafon {
    config: BridgeConfig,
    events: EventBus,
    session: OnceCell<Session>,
    gate: Mutex<()>,
}

impl Balafon {
    /// Creates the façade. The engine is not started until [`init`](Self::init).
    pub fn new(config: BridgeConfig) -> Self {
        let events = EventBus::new(config.event_buffer_size);
        Self {
            config,
            events,
            session: OnceCell::new(),
            gate: Mutex::new(()),
        }
    }

    /// Loads the engine and waits until it is ready.
    ///
    /// Safe to call concurrently and repeatedly: the engine is started once
    /// and later calls return immediately. A failed init leaves the façade
    /// uninitialized, and calling `init` again starts a fresh engine. Once a
    /// started engine has exited, `init` keeps failing; a new `Balafon` is
    /// needed.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Load`] if the module cannot be instantiated
    /// - [`CoreError::EngineExited`] if the engine ends before signalling,
    ///   or has exited since
    /// - [`CoreError::ReadinessTimeout`] if the configured timeout elapses
    /// - [`CoreError::CapabilityMissing`] if a required capability is absent
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<&Self> {
        let session = self.session.get_or_try_init(|| self.start_session()).await?;
        if let Some(exit) = session.engine.exit() {
            return Err(CoreError::EngineExited(exit.to_string()));
        }
        Ok(self)
    }

    async fn start_session(&self) -> Result<Session> {
        let loader = EngineLoader::new(Arc::clone(&self.config.module), self.events.clone());
        let engine = loader.load(HostBindings::from_config(&self.config))?;

        let capabilities = engine
            .readiness()
            .with_timeout(self.config.readiness_timeout)
            .wait()
            .await?;

        if let Some(missing) = self
            .config
            .required_capabilities
            .iter()
            .find(|capability| !capabilities.contains(**capability))
        {
            warn!(instance = %engine.id(), capability = %missing, "Required capability not registered");
            return Err(CoreError::CapabilityMissing {
                capability: missing.to_string(),
                message: format!(
                    "engine {} {} did not register it before signalling ready",
                    engine.info().name,
                    engine.info().version
                ),
            });
        }

        let registered = capabilities.registered();
        info!(instance = %engine.id(), capabilities = ?registered, "Engine ready");
        self.events
            .emit(BridgeEvent::EngineReady {
                instance: engine.id().as_uuid(),
                capabilities: registered,
            })
            .ok();

        Ok(Session {
            engine,
            capabilities,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    /// Identifier of the running engine instance, once initialized.
    pub fn instance_id(&self) -> Option<BridgeInstanceId> {
        self.session.get().map(|session| session.engine.id())
    }

    /// Capabilities the engine registered; empty before init.
    pub fn capabilities(&self) -> Vec<Capability> {
        self.session
            .get()
            .map(|session| session.capabilities.registered())
            .unwrap_or_default()
    }

    /// Engine liveness, once initialized.
    pub fn engine_status(&self) -> Option<EngineStatus> {
        self.session.get().map(|session| session.engine.status())
    }

    /// Subscribes to lifecycle and operation events.
    pub fn events(&self) -> Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// A buffer sized by the configured initial and maximum capacities.
    pub fn output_buffer(&self) -> OutputBuffer {
        OutputBuffer::with_limit(
            self.config.initial_buffer_capacity,
            self.config.max_buffer_capacity,
        )
    }

    /// Converts `source` into `buffer`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Operation`] with the error position for invalid source
    /// - [`CoreError::BufferTooSmall`] when the output does not fit; nothing
    ///   is recorded as written
    #[instrument(skip(self, buffer, source), fields(capacity = buffer.capacity()))]
    pub async fn convert(&self, buffer: &mut OutputBuffer, source: &str) -> Result<Converted> {
        let session = self.session()?;
        let convert = session.capability(Capability::Convert, CapabilitySet::convert)?;

        let capacity = buffer.capacity();
        let raw = {
            let _gate = self.gate.lock().await;
            convert(buffer.lend(), source)
        };

        match normalize_convert(raw) {
            Ok(converted) if converted.written > capacity => {
                warn!(
                    required = converted.written,
                    capacity, "Conversion output does not fit the buffer"
                );
                Err(CoreError::BufferTooSmall {
                    required: converted.written,
                    capacity,
                })
            }
            Ok(converted) => {
                buffer.set_written(converted.written);
                debug!(written = converted.written, "Conversion finished");
                Ok(converted)
            }
            Err(err) => {
                debug!(error = %err, "Conversion failed");
                self.events
                    .emit(BridgeEvent::ConversionFailed {
                        instance: session.engine.id().as_uuid(),
                        message: err.message.clone(),
                        position: err.position,
                    })
                    .ok();
                Err(err.into())
            }
        }
    }

    /// [`convert`](Self::convert), growing the buffer and retrying once when
    /// the output does not fit.
    pub async fn convert_growing(
        &self,
        buffer: &mut OutputBuffer,
        source: &str,
    ) -> Result<Converted> {
        match self.convert(buffer, source).await {
            Err(CoreError::BufferTooSmall { required, .. }) => {
                buffer.grow_to(required)?;
                debug!(capacity = buffer.capacity(), "Retrying conversion with a larger buffer");
                self.convert(buffer, source).await
            }
            result => result,
        }
    }

    /// Lists the output ports the engine currently sees.
    #[instrument(skip(self))]
    pub async fn list_ports(&self) -> Result<Vec<Port>> {
        let session = self.session()?;
        let list_ports = session.capability(Capability::ListPorts, CapabilitySet::list_ports)?;

        let raw = {
            let _gate = self.gate.lock().await;
            list_ports()
        };

        let payload = normalize(Capability::ListPorts, raw)?;
        debug!(count = payload.ports.len(), "Listed output ports");
        Ok(payload.ports)
    }

    /// Switches the active output port.
    #[instrument(skip(self))]
    pub async fn select_port(&self, number: u32) -> Result<()> {
        let session = self.session()?;
        let select_port = session.capability(Capability::SelectPort, CapabilitySet::select_port)?;

        let raw = {
            let _gate = self.gate.lock().await;
            select_port(number)
        };

        normalize(Capability::SelectPort, raw)?;
        info!(port = number, "Output port selected");
        self.events
            .emit(BridgeEvent::PortSelected {
                instance: session.engine.id().as_uuid(),
                number,
            })
            .ok();
        Ok(())
    }

    /// Plays `source`, or replays the engine's previous state when `None`.
    ///
    /// Playback runs inside the engine after this returns; later failures
    /// are reported on the host console.
    #[instrument(skip(self, source), fields(fresh_source = source.is_some()))]
    pub async fn play(&self, source: Option<&str>) -> Result<()> {
        let session = self.session()?;
        let play = session.capability(Capability::Play, CapabilitySet::play)?;

        let raw = {
            let _gate = self.gate.lock().await;
            play(source)
        };

        normalize(Capability::Play, raw)?;
        debug!("Playback started");
        self.events
            .emit(BridgeEvent::PlaybackStarted {
                instance: session.engine.id().as_uuid(),
                fresh_source: source.is_some(),
            })
            .ok();
        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        let session = self.session.get().ok_or(CoreError::NotInitialized)?;
        if let Some(exit) = session.engine.exit() {
            return Err(CoreError::EngineExited(exit.to_string()));
        }
        Ok(session)
    }
}

impl fmt::Debug for Balafon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Balafon")
            .field("module", &self.config.module.info())
            .field("instance", &self.instance_id())
            .field("capabilities", &self.capabilities())
            .finish_non_exhaustive()
    }
}
