//! Unified error type for the Typerace server.

use typerace_hub::{HubError, JoinError};
use typerace_protocol::ProtocolError;
use typerace_store::StoreError;
use typerace_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TyperaceError {
    /// Binding, accepting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persistent store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A hub operation was refused.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// A connection could not join its room.
    #[error(transparent)]
    Join(#[from] JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: TyperaceError = err.into();
        assert!(matches!(err, TyperaceError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: TyperaceError = err.into();
        assert!(matches!(err, TyperaceError::Protocol(_)));
    }

    #[test]
    fn test_from_store_error() {
        let err = StoreError::Unavailable("down".into());
        let err: TyperaceError = err.into();
        assert!(matches!(err, TyperaceError::Store(_)));
    }

    #[test]
    fn test_from_join_error_keeps_message() {
        let err: TyperaceError = JoinError::RoomFull("123456".into()).into();
        assert!(matches!(err, TyperaceError::Join(_)));
        assert_eq!(err.to_string(), "room 123456 is full");
    }

    #[test]
    fn test_from_hub_error() {
        let err: TyperaceError = HubError::SessionNotFound("1".into()).into();
        assert!(matches!(err, TyperaceError::Hub(_)));
    }
}
