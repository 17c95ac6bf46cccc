//! Per-connection gateway: handshake, event dispatch, outbound pump.
//!
//! One gateway task runs per accepted connection. It performs the
//! handshake (authenticate or resume), then loops over inbound client
//! events and routes them to the session, room, quiz, and stats layers.
//!
//! # Outbound path
//!
//! All events destined for this player, whether direct replies or room
//! broadcasts, flow through one unbounded queue. A separate pump task
//! drains it, wraps each event in a [`ServerEnvelope`] with the
//! connection's sequence counter, and writes to the socket. A single
//! writer per connection means sequence numbers and message order are
//! correct without any locking at the call sites.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use quizforge_protocol::{
    ClientEnvelope, ClientEvent, Codec, PlayerId, ServerEnvelope, ServerEvent,
};
use quizforge_room::{QuizError, QuizProvider, RoomError};
use quizforge_session::Authenticator;
use quizforge_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::QuizforgeError;
use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::stats::StatsStore;

/// How long the gateway waits for the handshake before giving up.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Idle cutoff for an established connection. Clients heartbeat well
/// inside this window.
const RECV_TIMEOUT: Duration = Duration::from_secs(60);

/// Identity established by a successful handshake.
struct Established {
    player_id: PlayerId,
    resume_token: String,
    /// True when the handshake resumed a prior session rather than
    /// authenticating afresh.
    resumed: bool,
}

/// Drives one client connection from accept to close.
pub(crate) async fn handle_connection<A, Q, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, Q, S, C>>,
) -> Result<(), QuizforgeError>
where
    A: Authenticator,
    Q: QuizProvider,
    S: StatsStore,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "connection accepted");

    let established = match perform_handshake(&conn, &state).await {
        Ok(est) => est,
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };
    let player_id = established.player_id;

    // Outbound queue. The clone of `tx` handed to a room becomes that
    // room's broadcast path to this player.
    let (tx, rx) = mpsc::unbounded_channel::<ServerEvent>();
    let pump = spawn_pump(conn.clone(), Arc::clone(&state), rx);

    let _ = tx.send(ServerEvent::HandshakeAck {
        player_id,
        reconnect_token: established.resume_token.clone(),
        server_time: epoch_ms(),
    });

    if established.resumed {
        // Re-bind the player to their room, if they were in one, and
        // replay the room state so the client can re-render.
        let result = {
            let rooms = state.rooms.lock().await;
            rooms.reconnect(player_id, tx.clone()).await
        };
        match result {
            Ok(snapshot) => {
                let _ = tx.send(ServerEvent::RoomJoined { room: snapshot });
            }
            Err(RoomError::NotInRoom(_)) => {}
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "room rebind failed");
            }
        }
    }

    tracing::info!(%conn_id, %player_id, "player online");

    let result = client_loop(&conn, &state, player_id, &tx).await;

    // Socket gone (or client said goodbye). Mark the session
    // disconnected and tell the room, both with their grace periods
    // running. A reconnect within the grace undoes both.
    state
        .sessions
        .lock()
        .await
        .disconnect(player_id)
        .unwrap_or_else(|e| {
            tracing::debug!(%player_id, error = %e, "session disconnect skipped");
        });
    {
        let mut rooms = state.rooms.lock().await;
        if let Err(e) = rooms.disconnect(player_id).await {
            if !matches!(e, RoomError::NotInRoom(_)) {
                tracing::debug!(%player_id, error = %e, "room disconnect skipped");
            }
        }
    }

    pump.abort();
    let _ = conn.close().await;
    tracing::info!(%conn_id, %player_id, "player offline");

    result
}

/// Waits for the handshake event and establishes the player's identity,
/// either by resuming a prior session or by authenticating the token.
///
/// Failure replies (`error` events) are written straight to the socket;
/// there is no player queue yet at this point.
async fn perform_handshake<A, Q, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, Q, S, C>,
) -> Result<Established, QuizforgeError>
where
    A: Authenticator,
    C: Codec,
{
    let data = match timeout(HANDSHAKE_TIMEOUT, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(quizforge_transport::TransportError::ConnectionClosed(
                "closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            send_raw(
                conn,
                state,
                ServerEvent::Error {
                    code: 408,
                    message: "handshake timed out".into(),
                },
            )
            .await;
            return Err(quizforge_transport::TransportError::ConnectionClosed(
                "handshake timeout".into(),
            )
            .into());
        }
    };

    let envelope: ClientEnvelope = match state.codec.decode(&data) {
        Ok(env) => env,
        Err(e) => {
            send_raw(
                conn,
                state,
                ServerEvent::Error {
                    code: 400,
                    message: "malformed handshake".into(),
                },
            )
            .await;
            return Err(e.into());
        }
    };

    let ClientEvent::Handshake {
        version,
        token,
        resume,
    } = envelope.event
    else {
        send_raw(
            conn,
            state,
            ServerEvent::Error {
                code: 400,
                message: "expected handshake".into(),
            },
        )
        .await;
        return Err(quizforge_protocol::ProtocolError::InvalidMessage(
            "first event was not a handshake".into(),
        )
        .into());
    };

    if version != PROTOCOL_VERSION {
        send_raw(
            conn,
            state,
            ServerEvent::Error {
                code: 400,
                message: format!(
                    "unsupported protocol version {version}, server speaks {PROTOCOL_VERSION}"
                ),
            },
        )
        .await;
        return Err(quizforge_protocol::ProtocolError::InvalidMessage(format!(
            "protocol version {version}"
        ))
        .into());
    }

    // Resume takes precedence over fresh authentication.
    if let Some(resume_token) = resume {
        let mut sessions = state.sessions.lock().await;
        match sessions.reconnect(&resume_token) {
            Ok(session) => {
                return Ok(Established {
                    player_id: session.player_id,
                    resume_token: session.resume_token.clone(),
                    resumed: true,
                });
            }
            Err(e) => {
                drop(sessions);
                send_raw(
                    conn,
                    state,
                    ServerEvent::Error {
                        code: 401,
                        message: e.to_string(),
                    },
                )
                .await;
                return Err(e.into());
            }
        }
    }

    let token = token.unwrap_or_default();
    let identity = match state.auth.authenticate(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            send_raw(
                conn,
                state,
                ServerEvent::Error {
                    code: 401,
                    message: e.to_string(),
                },
            )
            .await;
            return Err(e.into());
        }
    };

    let mut sessions = state.sessions.lock().await;
    match sessions.create(identity.player_id, identity.profile) {
        Ok(session) => Ok(Established {
            player_id: session.player_id,
            resume_token: session.resume_token.clone(),
            resumed: false,
        }),
        Err(e) => {
            drop(sessions);
            send_raw(
                conn,
                state,
                ServerEvent::Error {
                    code: 409,
                    message: e.to_string(),
                },
            )
            .await;
            Err(e.into())
        }
    }
}

/// Dispatches inbound events until the client disconnects.
async fn client_loop<A, Q, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, Q, S, C>,
    player_id: PlayerId,
    tx: &mpsc::UnboundedSender<ServerEvent>,
) -> Result<(), QuizforgeError>
where
    A: Authenticator,
    Q: QuizProvider,
    S: StatsStore,
    C: Codec,
{
    loop {
        let data = match timeout(RECV_TIMEOUT, conn.recv()).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => return Ok(()),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::debug!(%player_id, "connection idle, closing");
                return Ok(());
            }
        };

        let envelope: ClientEnvelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "undecodable message");
                queue(
                    tx,
                    ServerEvent::Error {
                        code: 400,
                        message: "malformed message".into(),
                    },
                );
                continue;
            }
        };

        match envelope.event {
            ClientEvent::Heartbeat { client_time } => {
                queue(
                    tx,
                    ServerEvent::HeartbeatAck {
                        client_time,
                        server_time: epoch_ms(),
                    },
                );
            }

            ClientEvent::CreateRoom { quiz_id, settings } => {
                // Fetch quiz content before taking the registry lock;
                // the provider may go to disk or the network.
                let quiz = match state.quizzes.fetch(&quiz_id).await {
                    Ok(quiz) => quiz,
                    Err(e) => {
                        queue(
                            tx,
                            ServerEvent::Error {
                                code: quiz_error_code(&e),
                                message: e.to_string(),
                            },
                        );
                        continue;
                    }
                };
                let profile = match profile_of(state, player_id).await {
                    Some(profile) => profile,
                    None => {
                        queue(
                            tx,
                            ServerEvent::Error {
                                code: 401,
                                message: "session lost".into(),
                            },
                        );
                        continue;
                    }
                };
                let result = {
                    let mut rooms = state.rooms.lock().await;
                    rooms
                        .create_room(player_id, profile, quiz, settings, tx.clone())
                        .await
                };
                match result {
                    Ok(snapshot) => {
                        queue(tx, ServerEvent::RoomCreated { room: snapshot })
                    }
                    Err(e) => queue_room_error(tx, &e),
                }
            }

            ClientEvent::JoinRoom { room_id } => {
                let profile = match profile_of(state, player_id).await {
                    Some(profile) => profile,
                    None => {
                        queue(
                            tx,
                            ServerEvent::Error {
                                code: 401,
                                message: "session lost".into(),
                            },
                        );
                        continue;
                    }
                };
                let result = {
                    let mut rooms = state.rooms.lock().await;
                    rooms.join_room(player_id, profile, &room_id, tx.clone()).await
                };
                match result {
                    Ok(snapshot) => {
                        queue(tx, ServerEvent::RoomJoined { room: snapshot })
                    }
                    Err(e) => queue_room_error(tx, &e),
                }
            }

            ClientEvent::StartQuiz => {
                let result = state.rooms.lock().await.start_quiz(player_id).await;
                if let Err(e) = result {
                    queue_room_error(tx, &e);
                }
            }

            ClientEvent::SubmitAnswer { answer, time_spent } => {
                // On success the room acks the submitter directly, so
                // only failures produce a reply here.
                let result = state
                    .rooms
                    .lock()
                    .await
                    .submit_answer(player_id, answer, time_spent)
                    .await;
                if let Err(e) = result {
                    queue_room_error(tx, &e);
                }
            }

            ClientEvent::LeaveRoom => {
                let result = state.rooms.lock().await.leave_room(player_id).await;
                if let Err(e) = result {
                    queue_room_error(tx, &e);
                }
            }

            ClientEvent::ChatMessage { message } => {
                let result = state.rooms.lock().await.chat(player_id, message).await;
                if let Err(e) = result {
                    queue_room_error(tx, &e);
                }
            }

            ClientEvent::ListRooms => {
                let rooms = state.rooms.lock().await.list_joinable().await;
                queue(tx, ServerEvent::RoomList { rooms });
            }

            ClientEvent::GetStats => {
                let stats = state.stats.player_stats(player_id).await;
                queue(
                    tx,
                    ServerEvent::PlayerStats {
                        games_played: stats.games_played,
                        wins: stats.wins,
                        average_score: stats.average_score,
                        win_rate: stats.win_rate,
                    },
                );
            }

            ClientEvent::Disconnect { reason } => {
                tracing::debug!(%player_id, %reason, "client disconnecting");
                return Ok(());
            }

            ClientEvent::Handshake { .. } => {
                queue(
                    tx,
                    ServerEvent::Error {
                        code: 400,
                        message: "handshake already completed".into(),
                    },
                );
            }
        }
    }
}

/// Spawns the outbound pump: the single writer for this connection.
fn spawn_pump<A, Q, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, Q, S, C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) -> tokio::task::JoinHandle<()>
where
    A: Send + Sync + 'static,
    Q: Send + Sync + 'static,
    S: Send + Sync + 'static,
    C: Codec,
{
    tokio::spawn(async move {
        let started = Instant::now();
        let mut seq: u64 = 0;

        while let Some(event) = rx.recv().await {
            let envelope = ServerEnvelope {
                seq,
                timestamp: started.elapsed().as_millis() as u64,
                event,
            };
            seq += 1;

            let bytes = match state.codec.encode(&envelope) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(error = %e, "outbound encode failed");
                    continue;
                }
            };
            if let Err(e) = conn.send(&bytes).await {
                tracing::debug!(error = %e, "outbound send failed, pump stopping");
                break;
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Queues an event for the outbound pump. A send error means the pump is
/// gone and the main loop is about to notice the dead socket anyway.
fn queue(tx: &mpsc::UnboundedSender<ServerEvent>, event: ServerEvent) {
    let _ = tx.send(event);
}

fn queue_room_error(tx: &mpsc::UnboundedSender<ServerEvent>, error: &RoomError) {
    queue(
        tx,
        ServerEvent::Error {
            code: room_error_code(error),
            message: error.to_string(),
        },
    );
}

/// Writes an envelope straight to the socket, bypassing the pump.
/// Only used during the handshake, before the pump exists.
async fn send_raw<A, Q, S, C>(
    conn: &WebSocketConnection,
    state: &ServerState<A, Q, S, C>,
    event: ServerEvent,
) where
    C: Codec,
{
    let envelope = ServerEnvelope {
        seq: 0,
        timestamp: 0,
        event,
    };
    if let Ok(bytes) = state.codec.encode(&envelope) {
        let _ = conn.send(&bytes).await;
    }
}

/// Looks up the player's profile from their session.
async fn profile_of<A, Q, S, C>(
    state: &ServerState<A, Q, S, C>,
    player_id: PlayerId,
) -> Option<quizforge_protocol::PlayerProfile> {
    state
        .sessions
        .lock()
        .await
        .get(&player_id)
        .map(|session| session.profile.clone())
}

/// HTTP-style code for a room failure.
fn room_error_code(error: &RoomError) -> u16 {
    match error {
        RoomError::NotHost(_) => 403,
        RoomError::NotFound(_) | RoomError::NotInRoom(_) | RoomError::Unavailable(_) => 404,
        RoomError::RoomFull(_)
        | RoomError::AlreadyInGame(_)
        | RoomError::DuplicateAnswer(_)
        | RoomError::InvalidPhase(_)
        | RoomError::InsufficientPlayers { .. } => 409,
        RoomError::InvalidAnswer(_)
        | RoomError::InvalidSettings(_)
        | RoomError::InvalidMessage(_) => 400,
    }
}

fn quiz_error_code(error: &QuizError) -> u16 {
    match error {
        QuizError::NotFound(_) => 404,
        QuizError::Unavailable(_) => 503,
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
