//! Response envelope normalization.
//!
//! Turns the raw [`RawEnvelope`] returned by a capability into either its
//! typed payload or an [`OperationError`]. An envelope is an error if and only
//! if its `err` field is present and non-empty; payload fields are never
//! consulted to decide success.

use bridge_traits::{Capability, ConvertPayload, Position, RawEnvelope};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, OperationError, Result};

/// Successful result of `convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Converted {
    /// Bytes of output written into the buffer.
    pub written: usize,
    /// End of the consumed input, when the engine reports it.
    pub position: Option<Position>,
}

/// Normalizes an envelope into its payload.
pub fn normalize<P>(
    capability: Capability,
    raw: RawEnvelope<P>,
) -> std::result::Result<P, OperationError> {
    if let Some(message) = raw.error_message() {
        return Err(OperationError::new(capability, message));
    }
    Ok(raw.payload)
}

/// Normalizes a `convert` envelope, keeping the position on both paths.
pub fn normalize_convert(
    raw: RawEnvelope<ConvertPayload>,
) -> std::result::Result<Converted, OperationError> {
    let position = raw.payload.pos;
    let payload = normalize(Capability::Convert, raw)
        .map_err(|err| err.with_position(position))?;

    Ok(Converted {
        written: payload.written,
        position: payload.pos,
    })
}

/// Parses a JSON envelope produced by an out-of-process engine and normalizes
/// it.
///
/// # Errors
///
/// - [`CoreError::Protocol`] when `json` is not a valid envelope
/// - [`CoreError::Operation`] when the envelope carries an error
pub fn decode_json<P>(capability: Capability, json: &str) -> Result<P>
where
    P: DeserializeOwned,
{
    let raw: RawEnvelope<P> = serde_json::from_str(json).map_err(|err| {
        CoreError::Protocol(format!("malformed {} envelope: {}", capability, err))
    })?;

    normalize(capability, raw).map_err(CoreError::from)
}
