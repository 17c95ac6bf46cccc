//! The event vocabulary: what clients may send and what the server emits.
//!
//! Both enums are internally tagged (`#[serde(tag = "type")]`) with
//! snake_case tags, so a submit looks like:
//!
//! ```json
//! { "type": "submit_answer", "answer": 2, "time_spent": 4.8 }
//! ```
//!
//! Every event rides inside an envelope that adds a per-direction sequence
//! number and a server-relative timestamp.

use serde::{Deserialize, Serialize};

use crate::types::{
    ChatEntry, LeaderboardEntry, PlayerId, PlayerPublic, QuestionView,
    RoomId, RoomSettings, RoomSnapshot, RoomSummary,
};

/// Events a client sends to the gateway.
///
/// Every variant except `handshake` carries an implicit authenticated
/// player identity — the one bound to the connection during the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// First message on every connection.
    ///
    /// `token` is the opaque credential for the authentication
    /// collaborator. `resume` is a reconnection token from a previous
    /// `handshake_ack`; when present and valid it restores the prior
    /// session instead of authenticating afresh.
    Handshake {
        version: u32,
        token: Option<String>,
        resume: Option<String>,
    },

    /// Keep-alive. `client_time` is echoed back for RTT measurement.
    Heartbeat { client_time: u64 },

    /// Create a room for the given quiz; the creator becomes host.
    CreateRoom {
        quiz_id: String,
        settings: RoomSettings,
    },

    /// Join an existing lobby-phase room by its code.
    JoinRoom { room_id: RoomId },

    /// Host-only: begin the quiz.
    StartQuiz,

    /// Answer the currently active question.
    ///
    /// `time_spent` is seconds elapsed on the client between question
    /// display and submission; the server clamps it to the question's
    /// time limit before scoring.
    SubmitAnswer { answer: usize, time_spent: f64 },

    /// Leave the current room.
    LeaveRoom,

    /// Say something to the room (length-capped).
    ChatMessage { message: String },

    /// Request the joinable-room listing.
    ListRooms,

    /// Request the requester's aggregate multiplayer statistics.
    GetStats,

    /// Orderly goodbye; the connection closes after this.
    Disconnect { reason: String },
}

/// Events the server emits to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake accepted. `reconnect_token` lets the client resume this
    /// session after a transient drop.
    HandshakeAck {
        player_id: PlayerId,
        reconnect_token: String,
        server_time: u64,
    },

    HeartbeatAck {
        client_time: u64,
        server_time: u64,
    },

    /// To the creator only.
    RoomCreated { room: RoomSnapshot },

    /// To the joining (or resuming) player.
    RoomJoined { room: RoomSnapshot },

    /// To existing members when someone joins.
    PlayerJoined {
        players: Vec<PlayerPublic>,
        player_count: usize,
    },

    /// To remaining members when someone leaves for good.
    PlayerLeft {
        players: Vec<PlayerPublic>,
        player_count: usize,
    },

    /// The previous host left or disconnected; a new one was picked.
    HostChanged {
        new_host_id: PlayerId,
        new_host_name: String,
    },

    /// A question went live. The correct option is never included.
    NewQuestion {
        question_index: usize,
        /// 1-based, for display ("Question 3 of 10").
        question_number: usize,
        total_questions: usize,
        /// Countdown length in seconds.
        time_limit: u64,
        question: QuestionView,
    },

    /// Private ack to the submitter: the answer was recorded.
    ///
    /// Correctness is deliberately withheld until `question_results`.
    AnswerReceived { question_index: usize },

    /// Broadcast progress: how many members have answered so far.
    AnswerSubmitted {
        player_name: String,
        answered_count: usize,
        total_players: usize,
    },

    /// The round closed (everyone answered, or the timer expired).
    QuestionResults {
        question_index: usize,
        correct_option: usize,
        leaderboard: Vec<LeaderboardEntry>,
    },

    /// The last round closed; the room is in its terminal phase.
    QuizFinished { leaderboard: Vec<LeaderboardEntry> },

    ChatMessage {
        player_id: PlayerId,
        player_name: String,
        message: String,
        timestamp: u64,
    },

    RoomList { rooms: Vec<RoomSummary> },

    PlayerStats {
        games_played: u64,
        wins: u64,
        average_score: f64,
        win_rate: f64,
    },

    /// A recoverable failure of the requesting action. `code` follows
    /// HTTP-style conventions (400 bad request, 401 unauthorized,
    /// 403 forbidden, 404 not found, 409 conflict).
    Error { code: u16, message: String },
}

impl ServerEvent {
    /// Builds a chat broadcast from a stored log entry.
    pub fn chat(entry: &ChatEntry) -> Self {
        Self::ChatMessage {
            player_id: entry.player_id,
            player_name: entry.player_name.clone(),
            message: entry.message.clone(),
            timestamp: entry.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Wrapper around every client → server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEnvelope {
    /// Client-maintained, auto-incrementing.
    pub seq: u64,
    /// Client-local milliseconds; opaque to the server.
    pub timestamp: u64,
    pub event: ClientEvent,
}

/// Wrapper around every server → client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEnvelope {
    /// Per-connection, auto-incrementing.
    pub seq: u64,
    /// Milliseconds since the connection was accepted.
    pub timestamp: u64,
    pub event: ServerEvent,
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire format is a contract with client SDKs, so these tests pin
    //! the exact JSON shapes rather than just round-tripping.

    use super::*;
    use crate::types::{Phase, PlayerProfile};

    #[test]
    fn test_client_event_tags_are_snake_case() {
        let ev = ClientEvent::StartQuiz;
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "start_quiz");

        let ev = ClientEvent::ListRooms;
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "list_rooms");
    }

    #[test]
    fn test_submit_answer_json_shape() {
        let ev = ClientEvent::SubmitAnswer {
            answer: 2,
            time_spent: 4.5,
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "submit_answer");
        assert_eq!(json["answer"], 2);
        assert_eq!(json["time_spent"], 4.5);
    }

    #[test]
    fn test_create_room_json_shape() {
        let ev = ClientEvent::CreateRoom {
            quiz_id: "capitals-1".into(),
            settings: RoomSettings {
                max_players: 4,
                time_per_question_secs: 20,
            },
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "create_room");
        assert_eq!(json["quiz_id"], "capitals-1");
        assert_eq!(json["settings"]["max_players"], 4);
    }

    #[test]
    fn test_handshake_without_tokens() {
        let ev = ClientEvent::Handshake {
            version: 1,
            token: None,
            resume: None,
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "handshake");
        assert!(json["token"].is_null());
        assert!(json["resume"].is_null());
    }

    #[test]
    fn test_new_question_never_carries_correct_option() {
        // The serialized form must expose only prompt and options.
        let ev = ServerEvent::NewQuestion {
            question_index: 0,
            question_number: 1,
            total_questions: 2,
            time_limit: 30,
            question: QuestionView {
                question: "2+2?".into(),
                options: vec!["3".into(), "4".into()],
            },
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "new_question");
        assert!(json["question"].get("correct_option").is_none());
        assert_eq!(json["question"]["options"][1], "4");
    }

    #[test]
    fn test_question_results_json_shape() {
        let ev = ServerEvent::QuestionResults {
            question_index: 3,
            correct_option: 1,
            leaderboard: vec![LeaderboardEntry {
                rank: 1,
                player_id: PlayerId(9),
                display_name: "ada".into(),
                avatar: "owl".into(),
                level: 5,
                score: 1800,
            }],
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "question_results");
        assert_eq!(json["correct_option"], 1);
        assert_eq!(json["leaderboard"][0]["rank"], 1);
        assert_eq!(json["leaderboard"][0]["score"], 1800);
    }

    #[test]
    fn test_error_event_json_shape() {
        let ev = ServerEvent::Error {
            code: 403,
            message: "only the host can start the quiz".into(),
        };
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], 403);
    }

    #[test]
    fn test_chat_broadcast_from_entry() {
        let entry = ChatEntry {
            player_id: PlayerId(4),
            player_name: "bea".into(),
            message: "gg".into(),
            timestamp: 1234,
        };
        let ev = ServerEvent::chat(&entry);
        let json: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "chat_message");
        assert_eq!(json["player_name"], "bea");
        assert_eq!(json["timestamp"], 1234);
    }

    #[test]
    fn test_client_envelope_round_trip() {
        let env = ClientEnvelope {
            seq: 7,
            timestamp: 1000,
            event: ClientEvent::JoinRoom {
                room_id: RoomId("AB12CD".into()),
            },
        };
        let bytes = serde_json::to_vec(&env).unwrap();
        let decoded: ClientEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn test_server_envelope_round_trip() {
        let env = ServerEnvelope {
            seq: 3,
            timestamp: 250,
            event: ServerEvent::HostChanged {
                new_host_id: PlayerId(2),
                new_host_name: "bea".into(),
            },
        };
        let bytes = serde_json::to_vec(&env).unwrap();
        let decoded: ServerEnvelope = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(env, decoded);
    }

    #[test]
    fn test_room_snapshot_event_round_trip() {
        let ev = ServerEvent::RoomJoined {
            room: RoomSnapshot {
                room_id: RoomId("QQQ111".into()),
                quiz_id: "flags".into(),
                quiz_title: "Flags of the world".into(),
                total_questions: 5,
                host_id: PlayerId(1),
                settings: RoomSettings::default(),
                phase: Phase::Lobby,
                current_question: None,
                players: vec![],
            },
        };
        let bytes = serde_json::to_vec(&ev).unwrap();
        let decoded: ServerEvent = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(ev, decoded);
    }

    #[test]
    fn test_profile_is_plain_struct() {
        let p = PlayerProfile {
            display_name: "ada".into(),
            avatar: "owl".into(),
            level: 2,
        };
        let json: serde_json::Value = serde_json::to_value(&p).unwrap();
        assert_eq!(json["display_name"], "ada");
    }

    #[test]
    fn test_decode_unknown_event_type_returns_error() {
        let unknown = r#"{"type": "fly_to_moon", "speed": 9000}"#;
        let result: Result<ClientEvent, _> = serde_json::from_str(unknown);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let garbage = b"not json at all";
        let result: Result<ClientEnvelope, _> = serde_json::from_slice(garbage);
        assert!(result.is_err());
    }
}
