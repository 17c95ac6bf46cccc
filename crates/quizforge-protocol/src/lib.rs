//! Wire protocol for Quizforge.
//!
//! This crate defines the vocabulary the quiz clients and the session
//! gateway speak:
//!
//! - **Types** ([`PlayerId`], [`RoomId`], [`Phase`], [`RoomSnapshot`],
//!   [`LeaderboardEntry`], ...) — the structures that travel on the wire.
//! - **Events** ([`ClientEvent`], [`ServerEvent`] and their envelopes) —
//!   every message either direction is one of these.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events become bytes.
//!
//! The protocol layer knows nothing about connections, timers, or rooms —
//! it only describes messages. Server-side state that must never reach a
//! client (correct answers of the live question, the answer ledger) is
//! deliberately absent from this crate.

mod codec;
mod error;
mod events;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ClientEnvelope, ClientEvent, ServerEnvelope, ServerEvent};
pub use types::{
    ChatEntry, LeaderboardEntry, MAX_CHAT_LEN, Phase, PlayerId, PlayerProfile,
    PlayerPublic, QuestionView, Recipient, RoomId, RoomSettings, RoomSnapshot,
    RoomSummary,
};
