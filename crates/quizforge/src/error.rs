//! Unified error type for the Quizforge engine.

use quizforge_protocol::ProtocolError;
use quizforge_room::{QuizError, RoomError};
use quizforge_session::SessionError;
use quizforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `quizforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate. The
/// `#[from]` attribute on each variant auto-generates `From` impls, so
/// the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizforgeError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, reconnect, expired).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A room-level error (full, not found, invalid phase).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A quiz-content error (unknown id, store unavailable).
    #[error(transparent)]
    Quiz(#[from] QuizError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let wrapped: QuizforgeError = err.into();
        assert!(matches!(wrapped, QuizforgeError::Transport(_)));
        assert!(wrapped.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let wrapped: QuizforgeError = err.into();
        assert!(matches!(wrapped, QuizforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::AuthFailed("nope".into());
        let wrapped: QuizforgeError = err.into();
        assert!(matches!(wrapped, QuizforgeError::Session(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(quizforge_protocol::RoomId("AB12CD".into()));
        let wrapped: QuizforgeError = err.into();
        assert!(matches!(wrapped, QuizforgeError::Room(_)));
    }

    #[test]
    fn test_from_quiz_error() {
        let err = QuizError::NotFound("capitals-1".into());
        let wrapped: QuizforgeError = err.into();
        assert!(matches!(wrapped, QuizforgeError::Quiz(_)));
        assert!(wrapped.to_string().contains("capitals-1"));
    }
}
