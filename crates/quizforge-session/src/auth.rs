//! Authentication hook for validating player identity.
//!
//! Quizforge doesn't implement authentication itself — that's your job
//! (or your auth provider's: Firebase, Auth0, Supabase, custom JWT, etc.).
//!
//! Instead, Quizforge defines the [`Authenticator`] trait: a single async
//! method that takes a token string and returns the player's identity and
//! profile, or an error. You implement this trait with your auth logic,
//! and the engine calls it during the handshake.
//!
//! Swapping implementations is how the same engine runs with JWT
//! validation in production, an accept-everyone authenticator in
//! development, and a mock in tests.

use quizforge_protocol::{PlayerId, PlayerProfile};

use crate::SessionError;

/// A player's identity as established by an [`Authenticator`].
///
/// The profile is what other players see in the lobby and on the
/// leaderboard; the auth layer owns it because display names and levels
/// come from the account system, not from the client.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    pub player_id: PlayerId,
    pub profile: PlayerProfile,
}

/// Validates a client's auth token and returns their identity.
///
/// # Trait bounds
///
/// - `Send + Sync` — the authenticator is shared across async tasks.
/// - `'static` — it doesn't borrow temporary data; it lives as long as
///   the server.
///
/// # Example
///
/// ```rust
/// use quizforge_session::{AuthIdentity, Authenticator, SessionError};
/// use quizforge_protocol::{PlayerId, PlayerProfile};
///
/// /// Accepts any numeric token and uses it as the player ID.
/// /// Only for development — never use this in production!
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(
///         &self,
///         token: &str,
///     ) -> Result<AuthIdentity, SessionError> {
///         let id: u64 = token.parse().map_err(|_| {
///             SessionError::AuthFailed("token must be a number".into())
///         })?;
///         Ok(AuthIdentity {
///             player_id: PlayerId(id),
///             profile: PlayerProfile {
///                 display_name: format!("Player {id}"),
///                 avatar: "default".into(),
///                 level: 1,
///             },
///         })
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates the given token and returns the player's identity.
    ///
    /// Called during the handshake when a client sends a
    /// [`ClientEvent::Handshake`](quizforge_protocol::ClientEvent::Handshake)
    /// with a token.
    ///
    /// # Returns
    /// - `Ok(AuthIdentity)` — authentication succeeded
    /// - `Err(SessionError::AuthFailed)` — token is invalid/expired
    fn authenticate(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<AuthIdentity, SessionError>> + Send;
}
