//! `QuizforgeServer` builder and server loop.
//!
//! This is the entry point for running a quiz server. It ties together
//! all the layers (transport → protocol → session → room), spawns the
//! maintenance task that reaps dead rooms, expires stale sessions, and
//! records finished matches, then accepts connections forever.

use std::sync::Arc;
use std::time::Duration;

use quizforge_protocol::{Codec, JsonCodec, RoomId};
use quizforge_room::{MatchOutcome, QuizProvider, RoomPolicy, RoomRegistry, ScoringPolicy};
use quizforge_session::{Authenticator, SessionConfig, SessionManager};
use quizforge_transport::{Transport, WebSocketTransport};
use tokio::sync::{Mutex, mpsc};

use crate::QuizforgeError;
use crate::gateway::handle_connection;
use crate::stats::StatsStore;

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// How often the maintenance task sweeps for expired sessions.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
/// Interior mutability via `Mutex` where needed.
pub(crate) struct ServerState<A, Q, S, C> {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) auth: A,
    pub(crate) quizzes: Q,
    pub(crate) stats: S,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Quizforge server.
///
/// # Example
///
/// ```rust,ignore
/// let server = QuizforgeServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(my_auth, my_quiz_catalog, my_stats)
///     .await?;
/// server.run().await
/// ```
pub struct QuizforgeServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    room_policy: RoomPolicy,
    scoring_policy: ScoringPolicy,
}

impl QuizforgeServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            room_policy: RoomPolicy::default(),
            scoring_policy: ScoringPolicy::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration (reconnect grace period).
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets the room pacing policy (results hold, linger, abandonment).
    pub fn room_policy(mut self, policy: RoomPolicy) -> Self {
        self.room_policy = policy;
        self
    }

    /// Sets the scoring curve parameters.
    pub fn scoring_policy(mut self, policy: ScoringPolicy) -> Self {
        self.scoring_policy = policy;
        self
    }

    /// Builds the server with the given collaborators.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults. The
    /// maintenance task starts immediately; connections are accepted
    /// once [`QuizforgeServer::run`] is called.
    pub async fn build<A, Q, S>(
        self,
        auth: A,
        quizzes: Q,
        stats: S,
    ) -> Result<QuizforgeServer<A, Q, S, JsonCodec>, QuizforgeError>
    where
        A: Authenticator,
        Q: QuizProvider,
        S: StatsStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let (registry, closed_rx, outcome_rx) =
            RoomRegistry::new(self.room_policy, self.scoring_policy);

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms: Mutex::new(registry),
            auth,
            quizzes,
            stats,
            codec: JsonCodec,
        });

        tokio::spawn(maintenance_loop(
            Arc::clone(&state),
            closed_rx,
            outcome_rx,
        ));

        Ok(QuizforgeServer { transport, state })
    }
}

impl Default for QuizforgeServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Quizforge server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizforgeServer<A, Q, S, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, Q, S, C>>,
}

impl QuizforgeServer<(), (), (), ()> {
    /// Creates a new builder.
    pub fn builder() -> QuizforgeServerBuilder {
        QuizforgeServerBuilder::new()
    }
}

impl<A, Q, S, C> QuizforgeServer<A, Q, S, C>
where
    A: Authenticator,
    Q: QuizProvider,
    S: StatsStore,
    C: Codec + Send + Sync + 'static,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a gateway task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), QuizforgeError> {
        tracing::info!("Quizforge server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// The server's background chores, all in one task:
///
/// - reap rooms whose actors have exited (closed-room channel)
/// - record finished matches into the stats store (outcome channel)
/// - expire sessions past the reconnect grace and evict those players
///   from their rooms for good
async fn maintenance_loop<A, Q, S, C>(
    state: Arc<ServerState<A, Q, S, C>>,
    mut closed_rx: mpsc::UnboundedReceiver<RoomId>,
    mut outcome_rx: mpsc::UnboundedReceiver<MatchOutcome>,
) where
    A: Authenticator,
    Q: QuizProvider,
    S: StatsStore,
    C: Send + Sync + 'static,
{
    let mut sweep = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            Some(room_id) = closed_rx.recv() => {
                state.rooms.lock().await.reap(&room_id);
            }
            Some(outcome) = outcome_rx.recv() => {
                tracing::info!(
                    room_id = %outcome.room_id,
                    quiz = %outcome.quiz_id,
                    "recording match outcome"
                );
                state.stats.record_match(&outcome).await;
            }
            _ = sweep.tick() => {
                let expired = {
                    let mut sessions = state.sessions.lock().await;
                    let expired = sessions.expire_stale();
                    sessions.cleanup_expired();
                    expired
                };
                for player_id in expired {
                    // The grace period is over; the player leaves their
                    // room permanently.
                    let mut rooms = state.rooms.lock().await;
                    if let Err(e) = rooms.leave_room(player_id).await {
                        tracing::debug!(%player_id, error = %e, "expiry eviction skipped");
                    }
                }
            }
        }
    }
}
