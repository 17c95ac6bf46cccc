//! Aggregate player statistics and the store that keeps them.
//!
//! The engine records one [`MatchOutcome`] per finished quiz and answers
//! `get_stats` queries from the accumulated history. Where the numbers
//! live is up to the [`StatsStore`] implementation — a database in
//! production, [`MemoryStats`] in tests and the demo.

use std::collections::HashMap;
use std::sync::Mutex;

use quizforge_protocol::PlayerId;
use quizforge_room::MatchOutcome;

/// A player's aggregate multiplayer record, as reported by `get_stats`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsSummary {
    pub games_played: u64,
    pub wins: u64,
    pub average_score: f64,
    /// Wins over games played, in `[0, 1]`. Zero with no games.
    pub win_rate: f64,
}

/// Persists match outcomes and serves aggregate queries.
///
/// Called at the quiz-finished boundary (never from inside a room actor)
/// and for `get_stats` requests, so a slow store can't stall a game.
pub trait StatsStore: Send + Sync + 'static {
    /// Records one finished quiz. Every ranked player's tally is updated;
    /// rank 1 counts as the win.
    fn record_match(
        &self,
        outcome: &MatchOutcome,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Returns the aggregate record for one player. Unknown players get
    /// the zeroed default rather than an error.
    fn player_stats(
        &self,
        player_id: PlayerId,
    ) -> impl std::future::Future<Output = StatsSummary> + Send;
}

/// Per-player running tally backing [`MemoryStats`].
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    games: u64,
    wins: u64,
    total_score: u64,
}

/// In-memory [`StatsStore`]. Nothing survives a restart; use it for
/// tests, demos, and single-night events.
#[derive(Debug, Default)]
pub struct MemoryStats {
    // std Mutex: held only for map access, never across an await.
    tallies: Mutex<HashMap<PlayerId, Tally>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsStore for MemoryStats {
    async fn record_match(&self, outcome: &MatchOutcome) {
        let mut tallies = self.tallies.lock().expect("stats lock poisoned");
        for entry in &outcome.rankings {
            let tally = tallies.entry(entry.player_id).or_default();
            tally.games += 1;
            tally.total_score += u64::from(entry.score);
            if entry.rank == 1 {
                tally.wins += 1;
            }
        }
    }

    async fn player_stats(&self, player_id: PlayerId) -> StatsSummary {
        let tallies = self.tallies.lock().expect("stats lock poisoned");
        let Some(tally) = tallies.get(&player_id) else {
            return StatsSummary::default();
        };

        StatsSummary {
            games_played: tally.games,
            wins: tally.wins,
            average_score: tally.total_score as f64 / tally.games as f64,
            win_rate: tally.wins as f64 / tally.games as f64,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
