//! Room policy knobs: phase timings and scoring parameters.
//!
//! Everything time- or score-related that isn't a per-room setting lives
//! here, so operators can tune pacing at server build time instead of
//! patching constants.

use std::time::Duration;

// ---------------------------------------------------------------------------
// RoomPolicy
// ---------------------------------------------------------------------------

/// Server-wide pacing policy, shared by every room.
///
/// Per-room knobs (capacity, question time limit) are
/// [`RoomSettings`](quizforge_protocol::RoomSettings), chosen by the host
/// at creation; this struct is what the host can't choose.
#[derive(Debug, Clone)]
pub struct RoomPolicy {
    /// How long results stay on screen between questions.
    pub results_hold: Duration,

    /// How long a finished room lingers before the actor exits, so
    /// players can study the final leaderboard and chat.
    pub finished_linger: Duration,

    /// How long a mid-quiz room survives with zero connected players
    /// before the actor gives up and exits.
    pub abandon_grace: Duration,

    /// Command channel capacity per room actor. Bounded so a flooding
    /// client backpressures instead of growing the queue.
    pub channel_size: usize,
}

impl Default for RoomPolicy {
    fn default() -> Self {
        Self {
            results_hold: Duration::from_secs(5),
            finished_linger: Duration::from_secs(60),
            abandon_grace: Duration::from_secs(30),
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// ScoringPolicy
// ---------------------------------------------------------------------------

/// Parameters of the speed-based scoring curve.
///
/// A correct answer earns between `floor_points` (at the time limit) and
/// `base_points` (instant), decaying linearly in between. Incorrect or
/// missing answers always earn zero regardless of policy.
#[derive(Debug, Clone, Copy)]
pub struct ScoringPolicy {
    /// Points for a correct answer at t = 0.
    pub base_points: u32,

    /// Points for a correct answer at t = time limit.
    pub floor_points: u32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            base_points: 1000,
            floor_points: 500,
        }
    }
}
