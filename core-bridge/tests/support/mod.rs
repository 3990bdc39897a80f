//! Scripted in-process engine for bridge tests.
//!
//! Mimics the real engine's contract: registers its capabilities, signals
//! ready, then parks until told to stop. The "notation" it accepts is a toy:
//! whitespace separated tokens made of letters, digits, `:`, `#`, `-` and
//! `.`, optionally grouped by `[` `]`.

#![allow(dead_code)]

use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as EngineResult;
use bridge_traits::{
    BridgeError, Capability, EngineInstance, EngineModule, HostImports, LogEntry, LogLevel,
    LoggerSink, ModuleInfo, Port, Position, RawEnvelope, PROTOCOL_VERSION,
};
use tokio::sync::Notify;

/// How the engine behaves around its readiness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Startup {
    /// Register, signal ready, park until stopped.
    Ready,
    /// Sleep first, then behave like `Ready`.
    ReadyAfter(Duration),
    /// Park forever without signalling.
    NeverReady,
    /// Return an error without signalling.
    FailBeforeReady,
    /// Panic without signalling.
    PanicBeforeReady,
}

/// Shared, inspectable state of a scripted engine.
#[derive(Default)]
pub struct EngineState {
    pub ports: Mutex<Vec<Port>>,
    pub selected: Mutex<Option<u32>>,
    pub last_played: Mutex<Option<String>>,
    /// Every capability invocation, in arrival order.
    pub calls: Mutex<Vec<String>>,
    pub instantiations: Mutex<usize>,
}

impl EngineState {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

pub struct ScriptedEngine {
    pub startup: Startup,
    pub capabilities: Vec<Capability>,
    pub protocol: u32,
    pub fail_instantiate: bool,
    pub state: Arc<EngineState>,
    pub stop: Arc<Notify>,
    /// When set, `convert("hold")` meets the test on this barrier twice:
    /// once on entry and once before returning.
    pub hold: Option<Arc<Barrier>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        let state = EngineState::default();
        *state.ports.lock().unwrap() = vec![Port::new(0, "Midi Through"), Port::new(1, "FluidSynth")];
        Self {
            startup: Startup::Ready,
            capabilities: Capability::ALL.to_vec(),
            protocol: PROTOCOL_VERSION,
            fail_instantiate: false,
            state: Arc::new(state),
            stop: Arc::new(Notify::new()),
            hold: None,
        }
    }

    pub fn startup(mut self, startup: Startup) -> Self {
        self.startup = startup;
        self
    }

    pub fn capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn protocol(mut self, protocol: u32) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn failing_instantiate(mut self) -> Self {
        self.fail_instantiate = true;
        self
    }

    pub fn holding_convert(mut self, barrier: Arc<Barrier>) -> Self {
        self.hold = Some(barrier);
        self
    }
}

impl EngineModule for ScriptedEngine {
    fn info(&self) -> ModuleInfo {
        ModuleInfo::new("scripted-balafon", "0.1.0").with_protocol(self.protocol)
    }

    fn instantiate(&self, imports: HostImports) -> EngineResult<Box<dyn EngineInstance>> {
        *self.state.instantiations.lock().unwrap() += 1;
        if self.fail_instantiate {
            return Err(BridgeError::InvalidModule(
                "module does not export run".to_string(),
            ));
        }
        Ok(Box::new(ScriptedInstance {
            imports,
            startup: self.startup,
            capabilities: self.capabilities.clone(),
            state: Arc::clone(&self.state),
            stop: Arc::clone(&self.stop),
            hold: self.hold.clone(),
        }))
    }
}

struct ScriptedInstance {
    imports: HostImports,
    startup: Startup,
    capabilities: Vec<Capability>,
    state: Arc<EngineState>,
    stop: Arc<Notify>,
    hold: Option<Arc<Barrier>>,
}

#[async_trait]
impl EngineInstance for ScriptedInstance {
    async fn run(self: Box<Self>) -> EngineResult<()> {
        let ScriptedInstance {
            imports,
            startup,
            capabilities,
            state,
            stop,
            hold,
        } = *self;
        let HostImports {
            mut registrar,
            console,
            ..
        } = imports;

        match startup {
            Startup::NeverReady => std::future::pending::<()>().await,
            Startup::FailBeforeReady => {
                return Err(BridgeError::OperationFailed(
                    "MIDI driver unavailable".to_string(),
                ))
            }
            Startup::PanicBeforeReady => panic!("engine trapped during startup"),
            Startup::ReadyAfter(delay) => tokio::time::sleep(delay).await,
            Startup::Ready => {}
        }

        for capability in capabilities {
            let state = Arc::clone(&state);
            match capability {
                Capability::Convert => {
                    let hold = hold.clone();
                    registrar.register_convert(move |buffer, source| {
                        state.record(format!("convert:{}", source));
                        if let (Some(barrier), "hold") = (&hold, source) {
                            barrier.wait();
                            barrier.wait();
                        }
                        match compile(source) {
                            Ok(output) => {
                                let n = output.len().min(buffer.len());
                                buffer[..n].copy_from_slice(&output[..n]);
                                RawEnvelope::converted(output.len(), Some(end_of(source)))
                            }
                            Err((message, pos)) => RawEnvelope::convert_error(message, pos),
                        }
                    });
                }
                Capability::ListPorts => {
                    registrar.register_list_ports(move || {
                        state.record("listPorts");
                        RawEnvelope::ports(state.ports.lock().unwrap().clone())
                    });
                }
                Capability::SelectPort => {
                    registrar.register_select_port(move |number| {
                        state.record(format!("selectPort:{}", number));
                        let mut selected = state.selected.lock().unwrap();
                        if let Some(previous) = selected.take() {
                            state.record(format!("closePort:{}", previous));
                        }
                        let exists = state.ports.lock().unwrap().iter().any(|p| p.number == number);
                        if !exists {
                            return RawEnvelope::error(format!(
                                "no output port with number {}",
                                number
                            ));
                        }
                        *selected = Some(number);
                        RawEnvelope::done()
                    });
                }
                Capability::Play => {
                    let console = console.clone();
                    registrar.register_play(move |source| {
                        state.record(format!("play:{}", source.unwrap_or("<previous>")));
                        let mut last = state.last_played.lock().unwrap();
                        let source = match source {
                            Some(source) => {
                                if let Err((message, _)) = compile(source) {
                                    return RawEnvelope::error(message);
                                }
                                source.to_string()
                            }
                            None => match last.clone() {
                                Some(previous) => previous,
                                None => return RawEnvelope::error("nothing to replay"),
                            },
                        };
                        if state.selected.lock().unwrap().is_none() {
                            // Playback itself fails after the call returned.
                            console.error("playback failed: no output port selected");
                        }
                        *last = Some(source);
                        RawEnvelope::done()
                    });
                }
            }
        }

        registrar.ready();
        stop.notified().await;
        Ok(())
    }
}

/// Toy compiler producing an XML-ish score.
pub fn compile(source: &str) -> Result<Vec<u8>, (String, Position)> {
    let mut depth = 0usize;
    for (offset, ch) in source.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' if depth == 0 => {
                return Err(("unexpected ']'".to_string(), position_at(source, offset)))
            }
            ']' => depth -= 1,
            c if c.is_alphanumeric() || c.is_whitespace() || ":#-.".contains(c) => {}
            c => {
                return Err((
                    format!("unexpected character '{}'", c),
                    position_at(source, offset),
                ))
            }
        }
    }
    if depth > 0 {
        return Err(("unexpected EOF".to_string(), end_of(source)));
    }

    let mut xml = String::from("<score>");
    for token in source.split_whitespace() {
        xml.push_str("<token>");
        xml.push_str(token);
        xml.push_str("</token>");
    }
    xml.push_str("</score>");
    Ok(xml.into_bytes())
}

pub fn position_at(source: &str, offset: usize) -> Position {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    Position::new(offset, line, column)
}

pub fn end_of(source: &str) -> Position {
    position_at(source, source.len())
}

/// Logger sink collecting engine console output.
#[derive(Default)]
pub struct RecordingConsole {
    pub entries: Mutex<Vec<LogEntry>>,
}

impl RecordingConsole {
    pub fn errors(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.level == LogLevel::Error)
            .map(|entry| entry.message.clone())
            .collect()
    }
}

#[async_trait]
impl LoggerSink for RecordingConsole {
    async fn log(&self, entry: LogEntry) -> EngineResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }
}
