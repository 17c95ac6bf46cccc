//! Error types for the session layer.

/// Errors that can occur during session management.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Authentication failed — the token was invalid, expired, or rejected
    /// by the [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No session exists for the given player.
    #[error("session not found for player {0}")]
    NotFound(quizforge_protocol::PlayerId),

    /// The resume token doesn't match anything the server issued.
    /// Could be a stale token, a typo, or a guessing attempt.
    #[error("invalid resume token")]
    InvalidToken,

    /// The session's reconnection grace period has elapsed.
    #[error("session expired for player {0}")]
    SessionExpired(quizforge_protocol::PlayerId),

    /// The player already has an active (Connected) session.
    /// A player can only have one session at a time.
    #[error("player {0} already has an active session")]
    AlreadyConnected(quizforge_protocol::PlayerId),
}
