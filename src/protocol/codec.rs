//! Envelope encoding and decoding

use super::types::{ClientAction, ServerEvent};
use serde_json::Value;
use thiserror::Error;

/// Why an inbound frame was dropped
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("envelope is not a JSON object")]
    NotAnObject,
    #[error("envelope has no string `type` discriminator")]
    MissingType,
    #[error("unknown envelope type: {0}")]
    UnknownType(String),
    #[error("invalid `{kind}` payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialize an outbound action into a text frame
pub fn encode(action: &ClientAction) -> Result<String, serde_json::Error> {
    serde_json::to_string(action)
}

/// Decode one inbound text frame
///
/// The discriminator is checked before the payload so that an unknown tag
/// and a broken payload are reported as different failures.
pub fn decode(frame: &str) -> Result<ServerEvent, DecodeError> {
    let value: Value = serde_json::from_str(frame).map_err(DecodeError::Malformed)?;
    let Value::Object(envelope) = &value else {
        return Err(DecodeError::NotAnObject);
    };
    let kind = envelope
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();

    if !ServerEvent::KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(DecodeError::UnknownType(kind));
    }

    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload { kind, source })
}
