//! Quiz rooms for Quizforge: the registry, the per-room actor, and the
//! scoring engine.
//!
//! # Architecture
//!
//! ```text
//!               ┌──────────────┐   spawn / route    ┌───────────┐
//!  gateway ───► │ RoomRegistry │ ─────────────────► │ RoomActor │  (one task
//!               └──────────────┘                    └───────────┘   per room)
//!                      ▲   closed-room channel            │
//!                      └──────────────────────────────────┘
//! ```
//!
//! Each room is a Tokio task owning its quiz, roster, answer ledger, and
//! phase countdown. The registry spawns actors, routes players to them
//! through cheap clonable handles, and reaps rooms when their actors exit.
//! Scoring is a pure module the actor calls into; quiz content comes from
//! the [`QuizProvider`] collaborator, resolved once at creation.

mod config;
mod error;
mod quiz;
mod registry;
mod room;
pub mod scoring;

pub use config::{RoomPolicy, ScoringPolicy};
pub use error::RoomError;
pub use quiz::{QuizDocument, QuizError, QuizProvider, QuizQuestion};
pub use registry::RoomRegistry;
pub use room::{DisconnectOutcome, MatchOutcome, PlayerSender, RoomHandle};
