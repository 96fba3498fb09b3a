//! Newline-delimited JSON framing for envelopes.

use crate::error::ConnectionError;
use crate::messages::ApiMessage;

/// Encode `message` as one JSON line, including the trailing `\n`.
///
/// # Errors
///
/// Returns [`ConnectionError::Codec`] if serialisation fails.
pub fn encode_frame(message: &ApiMessage) -> Result<Vec<u8>, ConnectionError> {
    let mut frame = serde_json::to_vec(message)?;
    frame.push(b'\n');
    Ok(frame)
}

/// Decode one line (with or without its line terminator) into an envelope.
///
/// # Errors
///
/// Returns [`ConnectionError::Codec`] if the line is not a valid envelope.
pub fn decode_frame(line: &str) -> Result<ApiMessage, ConnectionError> {
    Ok(serde_json::from_str(line.trim_end_matches(['\r', '\n']))?)
}
