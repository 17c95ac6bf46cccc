//! Session types: the data structures that represent a player's connection.
//!
//! A "session" is the server's record of an authenticated player. It tracks
//! who the player is, what connection state they're in, their public
//! profile, and the secret token that lets them resume after a dropped
//! connection.

use std::time::Instant;

use quizforge_protocol::{PlayerId, PlayerProfile};

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a disconnected player has to reconnect
    /// before their session is permanently expired.
    ///
    /// Default: 30 seconds. Set to 0 to disable reconnection entirely.
    pub reconnect_grace_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The current state of a player's session.
///
/// ```text
///   Connected ──(disconnect)──→ Disconnected ──(timeout)──→ Expired
///       ↑                            │
///       └────────(reconnect)─────────┘
/// ```
///
/// `since` records WHEN the player disconnected, so the manager can tell
/// whether the grace period has elapsed. `Instant` is monotonic, so wall
/// clock adjustments can't prematurely expire anyone.
#[derive(Debug, Clone)]
pub enum SessionState {
    /// Player is actively connected.
    Connected,

    /// Player disconnected at the given instant.
    /// They have until `since + grace_period` to reconnect.
    Disconnected { since: Instant },

    /// Grace period elapsed. The session is dead and will be cleaned up;
    /// the player must authenticate again to get a new one.
    Expired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single player's session on the server.
///
/// Created when a player successfully authenticates. Lives until the
/// player disconnects and the grace period expires (or the server shuts
/// down).
#[derive(Debug, Clone)]
pub struct Session {
    /// Which player this session belongs to.
    pub player_id: PlayerId,

    /// Current lifecycle state.
    pub state: SessionState,

    /// Public profile established at authentication. Rooms copy this
    /// into their rosters when the player joins.
    pub profile: PlayerProfile,

    /// A secret token the player can use to resume after a disconnect.
    ///
    /// Issued during the handshake. If the connection drops mid-quiz,
    /// the client reconnects and presents this token instead of
    /// re-authenticating, and the gateway puts them back into their
    /// room without losing their score.
    ///
    /// 32-character hex string (128 bits of randomness) — enough that
    /// guessing a live token is infeasible.
    pub resume_token: String,
}
