//! Shared wire types: identities, profiles, room views, leaderboards.
//!
//! Everything in this module travels on the wire in at least one event,
//! so it all derives `Serialize`/`Deserialize`. Server-only state (the
//! answer ledger, the correct option of the active question) deliberately
//! lives in `quizforge-room`, not here.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's stable identity, issued by the authentication collaborator.
///
/// Newtype over `u64` so a player id can never be confused with a question
/// index or a timestamp. `#[serde(transparent)]` keeps the JSON shape a
/// plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// An opaque room code, generated at creation and used as the addressable
/// channel name for every broadcast.
///
/// Codes are short uppercase alphanumeric strings (like "K7KQ2F") so a host
/// can read one out loud. The protocol layer treats them as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Player profile and public view
// ---------------------------------------------------------------------------

/// Display profile snapshot, copied from the authenticated identity when a
/// player joins a room. Read-only for the lifetime of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub display_name: String,
    pub avatar: String,
    pub level: u32,
}

/// The client-visible view of a room member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPublic {
    pub id: PlayerId,
    pub display_name: String,
    pub avatar: String,
    pub level: u32,
    /// `false` while the player is in the reconnection grace window.
    pub connected: bool,
    /// Cumulative score across all questions answered so far.
    pub score: u32,
}

// ---------------------------------------------------------------------------
// Room phase
// ---------------------------------------------------------------------------

/// The room's state-machine phase.
///
/// Transitions are monotonic except for the question cycle:
///
/// ```text
/// Lobby → QuestionActive → QuestionResults → QuestionActive (next index)
///                                          ↘ Finished (terminal)
/// ```
///
/// No phase ever reverts to `Lobby` once a quiz has started, and
/// `Finished` accepts no further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Lobby,
    QuestionActive,
    QuestionResults,
    Finished,
}

impl Phase {
    /// Whether new players may join (only during the lobby).
    pub fn is_joinable(self) -> bool {
        matches!(self, Self::Lobby)
    }

    /// Whether a quiz is in progress (a question is live or being scored).
    pub fn is_active(self) -> bool {
        matches!(self, Self::QuestionActive | Self::QuestionResults)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::QuestionActive => write!(f, "QuestionActive"),
            Self::QuestionResults => write!(f, "QuestionResults"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

// ---------------------------------------------------------------------------
// Room settings
// ---------------------------------------------------------------------------

/// Per-room settings, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Player capacity, inclusive of the host.
    pub max_players: usize,
    /// Countdown length for each question, in seconds.
    pub time_per_question_secs: u64,
}

impl RoomSettings {
    pub const MIN_PLAYERS: usize = 2;
    pub const MAX_PLAYERS: usize = 8;
    pub const MIN_TIME_SECS: u64 = 10;
    pub const MAX_TIME_SECS: u64 = 120;

    /// Checks both fields against their allowed ranges.
    ///
    /// Returns a human-readable description of the first violation, which
    /// the room layer wraps in its `InvalidSettings` error.
    pub fn validate(&self) -> Result<(), String> {
        if !(Self::MIN_PLAYERS..=Self::MAX_PLAYERS).contains(&self.max_players) {
            return Err(format!(
                "max_players must be {}-{}, got {}",
                Self::MIN_PLAYERS,
                Self::MAX_PLAYERS,
                self.max_players
            ));
        }
        if !(Self::MIN_TIME_SECS..=Self::MAX_TIME_SECS)
            .contains(&self.time_per_question_secs)
        {
            return Err(format!(
                "time_per_question_secs must be {}-{}, got {}",
                Self::MIN_TIME_SECS,
                Self::MAX_TIME_SECS,
                self.time_per_question_secs
            ));
        }
        Ok(())
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: 8,
            time_per_question_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Room views
// ---------------------------------------------------------------------------

/// A lobby-phase room as shown in the joinable-room listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub quiz_title: String,
    pub host_name: String,
    pub player_count: usize,
    pub max_players: usize,
}

/// Full client-visible room state, sent on create/join/resume.
///
/// Never includes correct answers or the per-question answer ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub quiz_id: String,
    pub quiz_title: String,
    pub total_questions: usize,
    pub host_id: PlayerId,
    pub settings: RoomSettings,
    pub phase: Phase,
    /// `None` until the host starts the quiz.
    pub current_question: Option<usize>,
    /// Members in join order.
    pub players: Vec<PlayerPublic>,
}

/// A question as shown to clients while it is live.
///
/// The correct option index is stripped before a question goes on the wire;
/// it is revealed only in `question_results`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// One row of a ranked leaderboard snapshot.
///
/// Ordering contract: cumulative score descending, ties broken by join
/// order; `rank` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub player_id: PlayerId,
    pub display_name: String,
    pub avatar: String,
    pub level: u32,
    pub score: u32,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Maximum accepted chat message length, in characters.
pub const MAX_CHAT_LEN: usize = 100;

/// One chat (or system) line, both as stored in the room's bounded log and
/// as broadcast to members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub player_id: PlayerId,
    pub player_name: String,
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

// ---------------------------------------------------------------------------
// Recipient — who should receive an event?
// ---------------------------------------------------------------------------

/// Addressing for an outbound event produced by a room operation.
///
/// A single inbound action may fan out into several `(Recipient, event)`
/// pairs — e.g. a valid answer produces a private ack to the submitter and
/// an `answer_submitted` count broadcast to the whole room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every connected member of the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone except the specified player.
    AllExcept(PlayerId),
}

// =========================================================================
// Tests
// =========================================================================
