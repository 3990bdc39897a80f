//! Wire-level response envelopes returned by engine capabilities.
//!
//! Protocol version 3 uses a single convention for every capability: an
//! optional `err` string next to the operation payload.
//!
//! ```json
//! {"written": 118, "pos": {"offset": 12, "line": 1, "column": 13}}
//! {"err": "unexpected EOF", "pos": {"offset": 7, "line": 1, "column": 8}}
//! {"ports": [{"number": 0, "name": "Midi Through"}]}
//! {}
//! ```
//!
//! An envelope is an error if and only if `err` is present and non-empty.
//! Payload fields never decide success, which is why every payload field has
//! a serde default: an error envelope still deserializes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the host/engine calling convention implemented by this crate.
pub const PROTOCOL_VERSION: u32 = 3;

/// Source location attached to conversion results.
///
/// On errors it points at the offending token; on success it denotes the end
/// of the consumed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// One output destination as seen by the engine at query time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    pub number: u32,
    pub name: String,
}

impl Port {
    pub fn new(number: u32, name: impl Into<String>) -> Self {
        Self {
            number,
            name: name.into(),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.number, self.name)
    }
}

/// Payload of the `convert` capability.
///
/// `written` is the number of bytes the complete output needs. The engine
/// copies at most the buffer length; a `written` larger than the buffer means
/// the output was truncated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertPayload {
    #[serde(default)]
    pub written: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<Position>,
}

/// Payload of the `listPorts` capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortsPayload {
    #[serde(default)]
    pub ports: Vec<Port>,
}

/// Payload of capabilities that only report success or failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Response envelope: optional error plus operation payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEnvelope<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> RawEnvelope<P> {
    /// Successful envelope carrying `payload`.
    pub fn ok(payload: P) -> Self {
        Self { err: None, payload }
    }

    /// The error message, if this envelope is an error.
    ///
    /// An empty string counts as "no error".
    pub fn error_message(&self) -> Option<&str> {
        self.err.as_deref().filter(|message| !message.is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.error_message().is_some()
    }
}

impl<P: Default> RawEnvelope<P> {
    /// Error envelope with a default payload.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            err: Some(message.into()),
            payload: P::default(),
        }
    }
}

impl RawEnvelope<ConvertPayload> {
    /// Successful conversion of `written` bytes ending at `pos`.
    pub fn converted(written: usize, pos: Option<Position>) -> Self {
        Self::ok(ConvertPayload { written, pos })
    }

    /// Failed conversion pointing at `pos`.
    pub fn convert_error(message: impl Into<String>, pos: Position) -> Self {
        Self {
            err: Some(message.into()),
            payload: ConvertPayload {
                written: 0,
                pos: Some(pos),
            },
        }
    }
}

impl RawEnvelope<PortsPayload> {
    pub fn ports(ports: Vec<Port>) -> Self {
        Self::ok(PortsPayload { ports })
    }
}

impl RawEnvelope<Empty> {
    /// Successful envelope with no payload.
    pub fn done() -> Self {
        Self::ok(Empty {})
    }
}
