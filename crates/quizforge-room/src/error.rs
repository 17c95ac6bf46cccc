//! Error types for the room layer.
//!
//! Every variant here is a recoverable, per-request failure: the gateway
//! maps it to an `error { code, message }` event for the offending
//! connection and the room keeps running.

use quizforge_protocol::{PlayerId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room doesn't exist (bad code, or already reaped).
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// The room is at capacity.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is already in a room (one room at a time).
    #[error("player {0} is already in a room")]
    AlreadyInGame(PlayerId),

    /// The player isn't a member of any room.
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// The operation is host-only.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// Not enough players to start the quiz.
    #[error("need at least {need} players to start, have {have}")]
    InsufficientPlayers { have: usize, need: usize },

    /// The operation isn't valid in the room's current phase.
    #[error("invalid phase: {0}")]
    InvalidPhase(String),

    /// The player already answered the current question.
    #[error("player {0} already answered this question")]
    DuplicateAnswer(PlayerId),

    /// The answer index doesn't name an option of the current question.
    #[error("answer index {0} out of range")]
    InvalidAnswer(usize),

    /// Room settings outside their allowed ranges.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Chat message rejected (empty or over the length cap).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The room actor is gone (channel closed mid-operation).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}
