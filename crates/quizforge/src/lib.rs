//! # Quizforge
//!
//! A real-time multiplayer quiz engine over WebSockets.
//!
//! Players authenticate, create or join rooms by six-character code, and
//! race through timed multiple-choice questions. Faster correct answers
//! score higher; a live leaderboard updates after every round.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                      QuizforgeServer                       │
//! │  ┌───────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐  │
//! │  │ transport │─►│ gateway  │─►│ sessions │  │  stats   │  │
//! │  └───────────┘  └────┬─────┘  └──────────┘  └──────────┘  │
//! │                      │        ┌──────────┐  ┌──────────┐  │
//! │                      └───────►│ registry │─►│ rooms... │  │
//! │                               └──────────┘  └──────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! This meta-crate wires the sub-crates together and re-exports their
//! public surface. Bring your own [`Authenticator`], [`QuizProvider`],
//! and [`StatsStore`]; everything else is batteries included.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use quizforge::QuizforgeServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quizforge::QuizforgeError> {
//!     let server = QuizforgeServer::builder()
//!         .bind("0.0.0.0:8080")
//!         .build(my_auth, my_quizzes, my_stats)
//!         .await?;
//!     server.run().await
//! }
//! ```

mod error;
mod gateway;
mod server;
mod stats;

pub use error::QuizforgeError;
pub use server::{PROTOCOL_VERSION, QuizforgeServer, QuizforgeServerBuilder};
pub use stats::{MemoryStats, StatsStore, StatsSummary};

// Re-export the sub-crate surface so downstream users need only this
// crate as a dependency.
pub use quizforge_protocol::{
    ChatEntry, ClientEnvelope, ClientEvent, Codec, JsonCodec, LeaderboardEntry,
    Phase, PlayerId, PlayerProfile, PlayerPublic, QuestionView, RoomId,
    RoomSettings, RoomSnapshot, RoomSummary, ServerEnvelope, ServerEvent,
};
pub use quizforge_room::{
    MatchOutcome, QuizDocument, QuizError, QuizProvider, QuizQuestion,
    RoomPolicy, ScoringPolicy,
};
pub use quizforge_session::{AuthIdentity, Authenticator, SessionConfig, SessionError};
pub use quizforge_transport::{WebSocketConnection, WebSocketTransport};
