//! Room registry: creates rooms, routes players to them, and reaps the
//! dead ones.
//!
//! The registry is the entry point for room operations from the gateway.
//! It owns one [`RoomHandle`] per live room plus the `player_rooms` index
//! that enforces the one-room-per-player invariant. Room actors announce
//! their own death on a notification channel, so the registry never polls.

use std::collections::HashMap;

use quizforge_protocol::{
    PlayerId, PlayerProfile, RoomId, RoomSettings, RoomSnapshot, RoomSummary,
};
use rand::Rng;
use tokio::sync::mpsc;

use crate::room::{DisconnectOutcome, spawn_room};
use crate::{
    MatchOutcome, PlayerSender, QuizDocument, RoomError, RoomHandle, RoomPolicy,
    ScoringPolicy,
};

/// Alphabet for room codes. Uppercase alphanumeric, minus the characters
/// players misread over voice chat (O/0, I/1/L).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Room code length. 31^6 ≈ 887M codes, plenty for one process.
const CODE_LEN: usize = 6;

/// Manages all active rooms and tracks which player is in which room.
pub struct RoomRegistry {
    /// Live rooms, keyed by code.
    rooms: HashMap<RoomId, RoomHandle>,

    /// Maps each player to the room they're in. A player is in at most
    /// ONE room at a time; disconnected players keep their entry so a
    /// reconnect can find its way back.
    player_rooms: HashMap<PlayerId, RoomId>,

    policy: RoomPolicy,
    scoring: ScoringPolicy,

    /// Handed to every spawned actor; the matching receiver drives the
    /// server's reaper task.
    closed_tx: mpsc::UnboundedSender<RoomId>,
    /// Likewise, for finished-quiz outcomes.
    outcome_tx: mpsc::UnboundedSender<MatchOutcome>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    ///
    /// Returns the registry plus two receivers: closed-room notifications
    /// (feed these back into [`RoomRegistry::reap`]) and match outcomes
    /// (feed these to the stats pipeline).
    pub fn new(
        policy: RoomPolicy,
        scoring: ScoringPolicy,
    ) -> (
        Self,
        mpsc::UnboundedReceiver<RoomId>,
        mpsc::UnboundedReceiver<MatchOutcome>,
    ) {
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let registry = Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            policy,
            scoring,
            closed_tx,
            outcome_tx,
        };
        (registry, closed_rx, outcome_rx)
    }

    /// Creates a room for `host` and joins them as its first member.
    ///
    /// `sender` is the host's outbound event queue, created by their
    /// connection handler. Validation happens before anything is spawned,
    /// so a rejected creation leaves no trace.
    pub async fn create_room(
        &mut self,
        host: PlayerId,
        profile: PlayerProfile,
        quiz: QuizDocument,
        settings: RoomSettings,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        settings.validate().map_err(RoomError::InvalidSettings)?;
        if quiz.is_empty() {
            return Err(RoomError::InvalidSettings("quiz has no questions".into()));
        }
        if self.player_rooms.contains_key(&host) {
            return Err(RoomError::AlreadyInGame(host));
        }

        let room_id = self.generate_code();
        let handle = spawn_room(
            room_id.clone(),
            host,
            quiz,
            settings,
            self.policy.clone(),
            self.scoring,
            self.closed_tx.clone(),
            self.outcome_tx.clone(),
        );

        let snapshot = handle.join(host, profile, sender).await?;

        self.rooms.insert(room_id.clone(), handle);
        self.player_rooms.insert(host, room_id.clone());
        tracing::info!(%room_id, %host, "room created");
        Ok(snapshot)
    }

    /// Adds a player to an existing room.
    ///
    /// Enforces the one-room-at-a-time invariant before the room actor
    /// sees anything, so a duplicate join never mutates room state.
    pub async fn join_room(
        &mut self,
        player_id: PlayerId,
        profile: PlayerProfile,
        room_id: &RoomId,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        if self.player_rooms.contains_key(&player_id) {
            return Err(RoomError::AlreadyInGame(player_id));
        }

        let handle = self.handle(room_id)?;
        let snapshot = handle.join(player_id, profile, sender).await?;
        self.player_rooms.insert(player_id, room_id.clone());
        Ok(snapshot)
    }

    /// Removes a player from their current room.
    pub async fn leave_room(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let room_id = self
            .player_rooms
            .remove(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;

        if let Some(handle) = self.rooms.get(&room_id) {
            handle.leave(player_id).await?;
        }
        Ok(())
    }

    /// Routes a start request from a player to their room.
    pub async fn start_quiz(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.room_of(player_id)?.start(player_id).await
    }

    /// Routes an answer to the player's room.
    pub async fn submit_answer(
        &self,
        player_id: PlayerId,
        answer: usize,
        time_spent: f64,
    ) -> Result<usize, RoomError> {
        self.room_of(player_id)?
            .submit_answer(player_id, answer, time_spent)
            .await
    }

    /// Routes a chat message to the player's room.
    pub async fn chat(
        &self,
        player_id: PlayerId,
        message: String,
    ) -> Result<(), RoomError> {
        self.room_of(player_id)?.chat(player_id, message).await
    }

    /// Reports a socket loss to the player's room.
    ///
    /// A mid-game disconnect keeps the `player_rooms` entry so a
    /// reconnect can find its way back; a lobby disconnect removes the
    /// member, so the entry is dropped to match, mirroring `leave_room`.
    pub async fn disconnect(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        let outcome = self.room_of(player_id)?.disconnect(player_id).await?;
        if outcome == DisconnectOutcome::Removed {
            self.player_rooms.remove(&player_id);
        }
        Ok(())
    }

    /// Re-binds a returning player to their room with a fresh outbound
    /// queue. Returns the snapshot for the `room_joined` replay.
    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        sender: PlayerSender,
    ) -> Result<RoomSnapshot, RoomError> {
        self.room_of(player_id)?.reconnect(player_id, sender).await
    }

    /// Lists rooms currently accepting players (lobby phase only).
    ///
    /// Rooms that fail to respond (mid-shutdown) are silently skipped.
    pub async fn list_joinable(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok((phase, summary)) = handle.summary().await {
                if phase.is_joinable() {
                    summaries.push(summary);
                }
            }
        }
        summaries
    }

    /// Shuts a room down and drops its players from the index.
    pub async fn destroy_room(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;

        let _ = handle.shutdown().await;
        self.player_rooms.retain(|_, rid| rid != room_id);

        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Forgets a room whose actor has already exited.
    ///
    /// Called by the server's reaper task for each id received on the
    /// closed-room channel.
    pub fn reap(&mut self, room_id: &RoomId) {
        if self.rooms.remove(room_id).is_some() {
            self.player_rooms.retain(|_, rid| rid != room_id);
            tracing::debug!(%room_id, "room reaped");
        }
    }

    /// Returns the room a player is currently in, if any.
    pub fn player_room(&self, player_id: &PlayerId) -> Option<&RoomId> {
        self.player_rooms.get(player_id)
    }

    /// Returns the number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns the handle for a room, if it's still alive.
    pub fn handle(&self, room_id: &RoomId) -> Result<&RoomHandle, RoomError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    fn room_of(&self, player_id: PlayerId) -> Result<&RoomHandle, RoomError> {
        let room_id = self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::NotInRoom(player_id))?;
        self.handle(room_id)
    }

    fn generate_code(&self) -> RoomId {
        let mut rng = rand::rng();
        loop {
            let code: String = (0..CODE_LEN)
                .map(|_| {
                    let i = rng.random_range(0..CODE_ALPHABET.len());
                    CODE_ALPHABET[i] as char
                })
                .collect();
            let id = RoomId(code);
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}
