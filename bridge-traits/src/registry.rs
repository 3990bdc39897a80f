//! Capability registration.
//!
//! An engine announces what it can do through the [`Registrar`] it receives
//! in its [`HostImports`](crate::engine::HostImports). Registration is a
//! private, per-instance affair: nothing is written to process-wide state.
//!
//! Calling [`Registrar::ready`] consumes the registrar, freezes the entries
//! into an immutable [`CapabilitySet`], and publishes that set through the
//! readiness latch. The host therefore cannot observe a partially registered
//! set, and readiness can be signalled at most once.

use core_async::sync::{latch, Latch, LatchSetter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::envelope::{ConvertPayload, Empty, PortsPayload, RawEnvelope};

/// One named operation an engine may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Convert,
    ListPorts,
    SelectPort,
    Play,
}

impl Capability {
    /// Every capability, in protocol order.
    pub const ALL: [Capability; 4] = [
        Capability::Convert,
        Capability::ListPorts,
        Capability::SelectPort,
        Capability::Play,
    ];

    /// Protocol name of the capability.
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Convert => "convert",
            Capability::ListPorts => "listPorts",
            Capability::SelectPort => "selectPort",
            Capability::Play => "play",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `convert(buffer, source)`: writes output into `buffer`, reports the size.
pub type ConvertFn = Arc<dyn Fn(&mut [u8], &str) -> RawEnvelope<ConvertPayload> + Send + Sync>;

/// `listPorts()`: live snapshot of output destinations.
pub type ListPortsFn = Arc<dyn Fn() -> RawEnvelope<PortsPayload> + Send + Sync>;

/// `selectPort(number)`: switches the active output destination.
pub type SelectPortFn = Arc<dyn Fn(u32) -> RawEnvelope<Empty> + Send + Sync>;

/// `play(source?)`: plays fresh source, or the previous state when `None`.
pub type PlayFn = Arc<dyn Fn(Option<&str>) -> RawEnvelope<Empty> + Send + Sync>;

/// Frozen set of capabilities an engine registered before signalling ready.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    convert: Option<ConvertFn>,
    list_ports: Option<ListPortsFn>,
    select_port: Option<SelectPortFn>,
    play: Option<PlayFn>,
}

impl CapabilitySet {
    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Convert => self.convert.is_some(),
            Capability::ListPorts => self.list_ports.is_some(),
            Capability::SelectPort => self.select_port.is_some(),
            Capability::Play => self.play.is_some(),
        }
    }

    /// Registered capabilities, in protocol order.
    pub fn registered(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.contains(*capability))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.registered().is_empty()
    }

    pub fn convert(&self) -> Option<&ConvertFn> {
        self.convert.as_ref()
    }

    pub fn list_ports(&self) -> Option<&ListPortsFn> {
        self.list_ports.as_ref()
    }

    pub fn select_port(&self) -> Option<&SelectPortFn> {
        self.select_port.as_ref()
    }

    pub fn play(&self) -> Option<&PlayFn> {
        self.play.as_ref()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("registered", &self.registered())
            .finish()
    }
}

/// Write side of capability registration, owned by the engine until ready.
pub struct Registrar {
    entries: CapabilitySet,
    ready: LatchSetter<CapabilitySet>,
}

impl Registrar {
    /// Creates a registrar and the latch the host waits on.
    pub fn new() -> (Self, Latch<CapabilitySet>) {
        let (ready, latch) = latch();
        (
            Self {
                entries: CapabilitySet::default(),
                ready,
            },
            latch,
        )
    }

    /// Registers the `convert` capability, replacing any earlier entry.
    pub fn register_convert<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut [u8], &str) -> RawEnvelope<ConvertPayload> + Send + Sync + 'static,
    {
        self.entries.convert = Some(Arc::new(f));
        self
    }

    /// Registers the `listPorts` capability, replacing any earlier entry.
    pub fn register_list_ports<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> RawEnvelope<PortsPayload> + Send + Sync + 'static,
    {
        self.entries.list_ports = Some(Arc::new(f));
        self
    }

    /// Registers the `selectPort` capability, replacing any earlier entry.
    pub fn register_select_port<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(u32) -> RawEnvelope<Empty> + Send + Sync + 'static,
    {
        self.entries.select_port = Some(Arc::new(f));
        self
    }

    /// Registers the `play` capability, replacing any earlier entry.
    pub fn register_play<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> RawEnvelope<Empty> + Send + Sync + 'static,
    {
        self.entries.play = Some(Arc::new(f));
        self
    }

    pub fn is_registered(&self, capability: Capability) -> bool {
        self.entries.contains(capability)
    }

    /// Publishes the registered capabilities and resolves the host's
    /// readiness barrier.
    pub fn ready(self) {
        let Registrar { entries, ready } = self;
        ready.set(entries);
    }
}

impl fmt::Debug for Registrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registrar")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Port;

    #[test]
    fn capability_names_follow_protocol() {
        let names: Vec<_> = Capability::ALL.iter().map(Capability::name).collect();
        assert_eq!(names, vec!["convert", "listPorts", "selectPort", "play"]);
        assert_eq!(
            serde_json::to_string(&Capability::SelectPort).unwrap(),
            "\"selectPort\""
        );
    }

    #[test]
    fn latch_stays_unset_until_ready() {
        let (mut registrar, latch) = Registrar::new();
        registrar.register_list_ports(|| RawEnvelope::ports(vec![Port::new(0, "Through")]));

        assert!(registrar.is_registered(Capability::ListPorts));
        assert!(!latch.is_set());

        registrar.ready();

        let set = latch.try_get().unwrap();
        assert_eq!(set.registered(), vec![Capability::ListPorts]);
        let ports = (set.list_ports().unwrap())();
        assert_eq!(ports.payload.ports.len(), 1);
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let (mut registrar, latch) = Registrar::new();
        registrar
            .register_select_port(|_| RawEnvelope::error("first"))
            .register_select_port(|_| RawEnvelope::done());
        registrar.ready();

        let set = latch.try_get().unwrap();
        assert!(!(set.select_port().unwrap())(1).is_error());
    }

    #[test]
    fn empty_set_reports_nothing() {
        let (registrar, latch) = Registrar::new();
        registrar.ready();
        let set = latch.try_get().unwrap();
        assert!(set.is_empty());
        assert!(!set.contains(Capability::Play));
        assert_eq!(format!("{set:?}"), "CapabilitySet { registered: [] }");
    }
}
