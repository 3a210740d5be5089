//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// JSON serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// JSON deserialization failed: malformed text, unknown `type`, or
    /// missing fields.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// Binary serialization failed.
    #[cfg(feature = "binary")]
    #[error("binary encode failed: {0}")]
    BinaryEncode(bincode::Error),

    /// Binary deserialization failed.
    #[cfg(feature = "binary")]
    #[error("binary decode failed: {0}")]
    BinaryDecode(bincode::Error),
}
