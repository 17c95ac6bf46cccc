//! The session manager: tracks all authenticated player sessions.
//!
//! Responsible for:
//! - Creating sessions when players authenticate
//! - Tracking which players are connected/disconnected
//! - Validating resume tokens
//! - Expiring sessions after the grace period
//! - Cleaning up dead sessions to free memory
//!
//! # Concurrency note
//!
//! `SessionManager` is NOT thread-safe by itself — it uses a plain
//! `HashMap`, not a concurrent one. The server owns it behind a single
//! mutex at a higher level; keeping it simple here avoids hidden locking
//! overhead.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use quizforge_protocol::{PlayerId, PlayerProfile};
use rand::Rng;

use crate::{Session, SessionConfig, SessionError, SessionState};

/// Manages all active player sessions.
///
/// ## Lifecycle
///
/// ```text
/// authenticate() ──→ create() ──→ disconnect() ──→ reconnect()
///                       │               │                │
///                       │               ▼                │
///                       │          expire_stale()        │
///                       │               │                │
///                       ▼               ▼                ▼
///                    [Connected]   [Disconnected]   [Connected]
///                                      │
///                                      ▼ (after grace period)
///                                  [Expired] ──→ cleanup_expired()
/// ```
pub struct SessionManager {
    /// All active sessions, keyed by player ID. A player can only have
    /// one session at a time.
    sessions: HashMap<PlayerId, Session>,

    /// Index from resume tokens to player IDs.
    ///
    /// A reconnecting client sends a token, not a player ID; this map
    /// resolves it without scanning every session. Kept in sync with
    /// `sessions`.
    tokens: HashMap<String, PlayerId>,

    config: SessionConfig,
}

impl SessionManager {
    /// Creates a new, empty session manager with the given config.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            tokens: HashMap::new(),
            config,
        }
    }

    /// Creates a new session for a player after successful authentication.
    ///
    /// Generates a random resume token and stores the session.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyConnected`] if the player already
    /// has an active (Connected) session.
    pub fn create(
        &mut self,
        player_id: PlayerId,
        profile: PlayerProfile,
    ) -> Result<&Session, SessionError> {
        if let Some(existing) = self.sessions.get(&player_id) {
            if matches!(existing.state, SessionState::Connected) {
                return Err(SessionError::AlreadyConnected(player_id));
            }
            // Disconnected/expired leftover: invalidate its token before
            // issuing a fresh session.
            self.tokens.remove(&existing.resume_token);
        }

        let token = generate_token();

        let session = Session {
            player_id,
            state: SessionState::Connected,
            profile,
            resume_token: token.clone(),
        };

        // Insert into both maps to keep them in sync.
        self.tokens.insert(token, player_id);
        self.sessions.insert(player_id, session);

        tracing::info!(%player_id, "session created");

        Ok(self.sessions.get(&player_id).expect("just inserted"))
    }

    /// Marks a player as disconnected. Starts the reconnection grace period.
    ///
    /// The session isn't destroyed yet — the player has
    /// `config.reconnect_grace_secs` to come back with their token.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if no session exists.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        session.state = SessionState::Disconnected {
            since: Instant::now(),
        };

        tracing::info!(%player_id, "player disconnected, grace period started");
        Ok(())
    }

    /// Reconnects a player using their resume token.
    ///
    /// If the token is valid and the session hasn't expired, the session
    /// transitions back to Connected.
    ///
    /// # Errors
    /// - [`SessionError::InvalidToken`] — token not recognized
    /// - [`SessionError::SessionExpired`] — grace period elapsed
    /// - [`SessionError::AlreadyConnected`] — session never disconnected
    pub fn reconnect(&mut self, token: &str) -> Result<&Session, SessionError> {
        let player_id = self
            .tokens
            .get(token)
            .copied()
            .ok_or(SessionError::InvalidToken)?;

        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::InvalidToken)?;

        match &session.state {
            SessionState::Disconnected { since } => {
                let grace = Duration::from_secs(self.config.reconnect_grace_secs);
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    return Err(SessionError::SessionExpired(player_id));
                }
                session.state = SessionState::Connected;
                tracing::info!(%player_id, "player reconnected");
                Ok(self.sessions.get(&player_id).expect("just modified"))
            }
            SessionState::Connected => Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Expired => Err(SessionError::SessionExpired(player_id)),
        }
    }

    /// Scans all sessions and expires any past the grace period.
    ///
    /// Call this periodically. Returns the player IDs that were expired
    /// so the caller can evict them from their rooms.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = Duration::from_secs(self.config.reconnect_grace_secs);
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = &session.state {
                if since.elapsed() > grace {
                    session.state = SessionState::Expired;
                    expired.push(session.player_id);
                    tracing::info!(
                        player_id = %session.player_id,
                        "session expired (grace period elapsed)"
                    );
                }
            }
        }

        expired
    }

    /// Removes all expired sessions, freeing memory.
    ///
    /// Separate from `expire_stale()` so higher layers can react to
    /// expirations (evict the player from their room, record stats)
    /// before the data is deleted.
    pub fn cleanup_expired(&mut self) {
        self.sessions.retain(|_, session| {
            if matches!(session.state, SessionState::Expired) {
                self.tokens.remove(&session.resume_token);
                false
            } else {
                true
            }
        });
    }

    /// Looks up a session by player ID.
    pub fn get(&self, player_id: &PlayerId) -> Option<&Session> {
        self.sessions.get(player_id)
    }

    /// Returns the number of sessions (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! # Testing time-dependent behavior
    //!
    //! Grace-period expiry depends on elapsed time. Instead of sleeping,
    //! two configs cover both sides:
    //!   - `reconnect_grace_secs: 0` → sessions expire immediately
    //!   - `reconnect_grace_secs: 3600` → sessions never expire in-test

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn manager_with_instant_expiry() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 0,
        })
    }

    fn manager_with_long_grace() -> SessionManager {
        SessionManager::new(SessionConfig {
            reconnect_grace_secs: 3600,
        })
    }

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn profile(name: &str) -> PlayerProfile {
        PlayerProfile {
            display_name: name.to_string(),
            avatar: "default".to_string(),
            level: 1,
        }
    }

    // =====================================================================
    // create()
    // =====================================================================

    #[test]
    fn test_create_new_player_returns_connected_session() {
        let mut mgr = manager_with_long_grace();

        let session = mgr.create(pid(1), profile("alice")).expect("should succeed");

        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.player_id, pid(1));
        assert_eq!(session.profile.display_name, "alice");
        // Resume token should be 32 hex chars.
        assert_eq!(session.resume_token.len(), 32);
    }

    #[test]
    fn test_create_multiple_players_each_gets_unique_token() {
        let mut mgr = manager_with_long_grace();

        let token1 = mgr
            .create(pid(1), profile("alice"))
            .expect("should succeed")
            .resume_token
            .clone();
        let token2 = mgr
            .create(pid(2), profile("bob"))
            .expect("should succeed")
            .resume_token
            .clone();

        assert_ne!(token1, token2, "tokens must be unique per player");
    }

    #[test]
    fn test_create_already_connected_returns_error() {
        let mut mgr = manager_with_long_grace();
        mgr.create(pid(1), profile("alice")).unwrap();

        let result = mgr.create(pid(1), profile("alice"));

        assert!(
            matches!(result, Err(SessionError::AlreadyConnected(p)) if p == pid(1)),
            "should reject duplicate connected session"
        );
    }

    #[test]
    fn test_create_replaces_disconnected_session() {
        // A player who disconnected and re-authenticates (instead of
        // using their resume token) gets a fresh session.
        let mut mgr = manager_with_long_grace();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        let session = mgr
            .create(pid(1), profile("alice"))
            .expect("should replace disconnected session");
        assert!(matches!(session.state, SessionState::Connected));
    }

    #[test]
    fn test_create_replaces_expired_session() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        mgr.expire_stale();

        let session = mgr
            .create(pid(1), profile("alice"))
            .expect("should replace expired session");
        assert!(matches!(session.state, SessionState::Connected));
    }

    // =====================================================================
    // disconnect()
    // =====================================================================

    #[test]
    fn test_disconnect_connected_player_becomes_disconnected() {
        let mut mgr = manager_with_long_grace();
        mgr.create(pid(1), profile("alice")).unwrap();

        mgr.disconnect(pid(1)).expect("should succeed");

        let session = mgr.get(&pid(1)).expect("session should still exist");
        assert!(
            matches!(session.state, SessionState::Disconnected { .. }),
            "state should be Disconnected, got {:?}",
            session.state
        );
    }

    #[test]
    fn test_disconnect_unknown_player_returns_not_found() {
        let mut mgr = manager_with_long_grace();

        let result = mgr.disconnect(pid(99));

        assert!(
            matches!(result, Err(SessionError::NotFound(p)) if p == pid(99)),
            "should return NotFound for unknown player"
        );
    }

    #[test]
    fn test_disconnect_preserves_resume_token() {
        // The token must survive a disconnect — it's what the player
        // reconnects with.
        let mut mgr = manager_with_long_grace();
        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();

        mgr.disconnect(pid(1)).unwrap();

        let session = mgr.get(&pid(1)).unwrap();
        assert_eq!(session.resume_token, token);
    }

    // =====================================================================
    // reconnect()
    // =====================================================================

    #[test]
    fn test_reconnect_valid_token_restores_connected() {
        let mut mgr = manager_with_long_grace();
        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();
        mgr.disconnect(pid(1)).unwrap();

        let session = mgr.reconnect(&token).expect("should succeed");

        assert!(matches!(session.state, SessionState::Connected));
        assert_eq!(session.player_id, pid(1));
    }

    #[test]
    fn test_reconnect_invalid_token_returns_error() {
        let mut mgr = manager_with_long_grace();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        let result = mgr.reconnect("not-a-real-token");

        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[test]
    fn test_reconnect_after_grace_period_returns_expired() {
        let mut mgr = manager_with_instant_expiry();
        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();
        mgr.disconnect(pid(1)).unwrap();

        let result = mgr.reconnect(&token);

        assert!(
            matches!(result, Err(SessionError::SessionExpired(p)) if p == pid(1)),
            "should reject reconnection after grace period"
        );
    }

    #[test]
    fn test_reconnect_already_connected_returns_error() {
        let mut mgr = manager_with_long_grace();
        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();

        let result = mgr.reconnect(&token);

        assert!(
            matches!(result, Err(SessionError::AlreadyConnected(p)) if p == pid(1)),
            "should reject reconnect when already connected"
        );
    }

    // =====================================================================
    // expire_stale()
    // =====================================================================

    #[test]
    fn test_expire_stale_expires_timed_out_sessions() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.create(pid(2), profile("bob")).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        // Player 2 stays connected.

        let expired = mgr.expire_stale();

        assert_eq!(expired, vec![pid(1)]);
        let s2 = mgr.get(&pid(2)).unwrap();
        assert!(matches!(s2.state, SessionState::Connected));
    }

    #[test]
    fn test_expire_stale_skips_sessions_within_grace() {
        let mut mgr = manager_with_long_grace();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        let expired = mgr.expire_stale();

        assert!(expired.is_empty());
    }

    // =====================================================================
    // cleanup_expired()
    // =====================================================================

    #[test]
    fn test_cleanup_expired_removes_expired_sessions() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        mgr.expire_stale();

        // Expired but not yet cleaned up.
        assert_eq!(mgr.len(), 1);

        mgr.cleanup_expired();

        assert_eq!(mgr.len(), 0);
        assert!(mgr.get(&pid(1)).is_none());
    }

    #[test]
    fn test_cleanup_expired_preserves_active_sessions() {
        let mut mgr = manager_with_instant_expiry();
        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.create(pid(2), profile("bob")).unwrap();
        mgr.disconnect(pid(1)).unwrap();
        mgr.expire_stale();

        mgr.cleanup_expired();

        assert_eq!(mgr.len(), 1);
        assert!(mgr.get(&pid(1)).is_none());
        assert!(mgr.get(&pid(2)).is_some());
    }

    #[test]
    fn test_cleanup_expired_invalidates_old_token() {
        // A stale token must not resolve after the session is removed.
        let mut mgr = manager_with_instant_expiry();
        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();
        mgr.disconnect(pid(1)).unwrap();
        mgr.expire_stale();
        mgr.cleanup_expired();

        let result = mgr.reconnect(&token);

        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    // =====================================================================
    // Full lifecycle
    // =====================================================================

    #[test]
    fn test_full_lifecycle_connect_disconnect_reconnect() {
        // Player connects, WiFi drops mid-quiz, they reconnect within
        // the grace period.
        let mut mgr = manager_with_long_grace();

        let token = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();

        mgr.disconnect(pid(1)).unwrap();
        assert!(matches!(
            mgr.get(&pid(1)).unwrap().state,
            SessionState::Disconnected { .. }
        ));

        mgr.reconnect(&token).unwrap();
        assert!(matches!(
            mgr.get(&pid(1)).unwrap().state,
            SessionState::Connected
        ));
    }

    #[test]
    fn test_full_lifecycle_connect_disconnect_expire_cleanup() {
        // Player connects, disconnects, never comes back.
        let mut mgr = manager_with_instant_expiry();

        mgr.create(pid(1), profile("alice")).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        let expired = mgr.expire_stale();
        assert_eq!(expired, vec![pid(1)]);

        mgr.cleanup_expired();
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_multiple_players_independent_lifecycles() {
        let mut mgr = manager_with_long_grace();

        let token1 = mgr
            .create(pid(1), profile("alice"))
            .unwrap()
            .resume_token
            .clone();
        mgr.create(pid(2), profile("bob")).unwrap();

        // Player 1 disconnects and reconnects; player 2 is unaffected.
        mgr.disconnect(pid(1)).unwrap();
        mgr.reconnect(&token1).unwrap();

        assert!(matches!(
            mgr.get(&pid(1)).unwrap().state,
            SessionState::Connected
        ));
        assert!(matches!(
            mgr.get(&pid(2)).unwrap().state,
            SessionState::Connected
        ));
    }
}
