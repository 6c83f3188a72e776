//! Error types for the protocol layer.
//!
//! Each Typerace crate defines its own error enum. A `ProtocolError`
//! always means the bytes or their contents were wrong, never that a
//! socket broke or a room was missing.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a missing `type` field, or a
    /// payload whose fields have the wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded but its contents are out of range, e.g. an
    /// accuracy of `1.7` or a negative error metric.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
