//! The scoring engine: pure functions from answers to points and from
//! scores to leaderboards.
//!
//! Nothing here touches a clock, a channel, or an RNG — given the same
//! inputs, the same outputs, always. The room actor is the only caller,
//! but keeping this a separate module makes the scoring contract
//! independently testable.

use quizforge_protocol::{LeaderboardEntry, PlayerId, PlayerProfile};

use crate::ScoringPolicy;

/// Points earned for one answer.
///
/// - Incorrect: 0, regardless of speed.
/// - Correct: linear decay from `base_points` at t = 0 down to
///   `floor_points` at t = `limit_secs`. `time_spent` is clamped to
///   `[0, limit_secs]` first, so client-reported times outside the
///   window can't mint extra points.
pub fn score(
    policy: &ScoringPolicy,
    correct: bool,
    time_spent: f64,
    limit_secs: f64,
) -> u32 {
    if !correct {
        return 0;
    }
    if limit_secs <= 0.0 {
        return policy.base_points;
    }

    let t = time_spent.clamp(0.0, limit_secs);
    let span = policy.base_points.saturating_sub(policy.floor_points) as f64;
    (policy.base_points as f64 - span * (t / limit_secs)).round() as u32
}

/// Builds a ranked leaderboard from players in join order.
///
/// Ordering contract: cumulative score descending; ties keep join order
/// (the sort is stable). Ranks are 1-based and assigned after sorting,
/// so tied scores still get distinct ranks in join order.
pub fn build_leaderboard(
    players: &[(PlayerId, &PlayerProfile, u32)],
) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<_> = players.to_vec();
    sorted.sort_by_key(|(_, _, score)| std::cmp::Reverse(*score));

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, (player_id, profile, score))| LeaderboardEntry {
            rank: i + 1,
            player_id,
            display_name: profile.display_name.clone(),
            avatar: profile.avatar.clone(),
            level: profile.level,
            score,
        })
        .collect()
}

// =========================================================================
// Tests
// =========================================================================
