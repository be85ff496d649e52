//! JSON codec for the wire envelope.
//!
//! Centralizes encoding and decoding of the protocol's JSON messages so
//! the rest of the crate never touches `serde_json` directly. Error
//! messages are carried as strings because the underlying serde errors are
//! opaque — they expose failure reasons only through `Display`, and codec
//! failures are exceptional (malformed frames), not a hot path.

use std::fmt;

use crate::network::messages::{ClientMessage, ServerMessage};

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CodecError {
    /// The encoding operation failed.
    Encode {
        /// The underlying serde error message.
        message: String,
    },
    /// An inbound frame could not be decoded. The frame is dropped and the
    /// connection stays open.
    Decode {
        /// The underlying serde error message.
        message: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode { message } => write!(f, "encoding failed: {message}"),
            Self::Decode { message } => write!(f, "decoding failed: {message}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encodes a client message into its JSON text frame.
pub fn encode_client(msg: &ClientMessage) -> CodecResult<String> {
    serde_json::to_string(msg).map_err(|e| CodecError::Encode {
        message: e.to_string(),
    })
}

/// Decodes a server text frame.
///
/// Callers treat a `Decode` error as a malformed message: log it, drop the
/// frame, keep the connection.
pub fn decode_server(text: &str) -> CodecResult<ServerMessage> {
    serde_json::from_str(text).map_err(|e| CodecError::Decode {
        message: e.to_string(),
    })
}
