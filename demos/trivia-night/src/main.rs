//! Trivia-night: a runnable Quizforge server with a static quiz catalog.
//!
//! Accepts any numeric token as a login (the number becomes the player
//! id), serves two built-in quizzes, and keeps stats in memory. Point a
//! WebSocket client at `ws://127.0.0.1:8080` and send:
//!
//! ```json
//! {"seq":0,"timestamp":0,"event":{"type":"handshake","version":1,"token":"1","resume":null}}
//! ```
//!
//! Set `RUST_LOG=quizforge=debug` for a play-by-play on stderr.

use std::collections::HashMap;

use quizforge::{
    AuthIdentity, Authenticator, MemoryStats, PlayerId, PlayerProfile, QuizDocument,
    QuizError, QuizProvider, QuizQuestion, QuizforgeError, QuizforgeServer,
    SessionError,
};
use tracing_subscriber::EnvFilter;

/// Development login: any numeric token is accepted and becomes the
/// player id. Replace with a real credential check in production.
struct NumericAuth;

impl Authenticator for NumericAuth {
    async fn authenticate(&self, token: &str) -> Result<AuthIdentity, SessionError> {
        let id: u64 = token
            .parse()
            .map_err(|_| SessionError::AuthFailed("token must be a number".into()))?;
        Ok(AuthIdentity {
            player_id: PlayerId(id),
            profile: PlayerProfile {
                display_name: format!("player-{id}"),
                avatar: "default".into(),
                level: 1,
            },
        })
    }
}

/// Static in-memory quiz catalog.
struct Catalog {
    quizzes: HashMap<String, QuizDocument>,
}

impl Catalog {
    fn new() -> Self {
        let mut quizzes = HashMap::new();
        for quiz in [capitals(), oceans()] {
            quizzes.insert(quiz.id.clone(), quiz);
        }
        Self { quizzes }
    }
}

impl QuizProvider for Catalog {
    async fn fetch(&self, quiz_id: &str) -> Result<QuizDocument, QuizError> {
        self.quizzes
            .get(quiz_id)
            .cloned()
            .ok_or_else(|| QuizError::NotFound(quiz_id.to_string()))
    }
}

fn capitals() -> QuizDocument {
    QuizDocument {
        id: "capitals".into(),
        title: "World Capitals".into(),
        questions: vec![
            QuizQuestion {
                prompt: "What is the capital of France?".into(),
                options: vec!["Berlin".into(), "Paris".into(), "Madrid".into(), "Rome".into()],
                correct_option: 1,
            },
            QuizQuestion {
                prompt: "What is the capital of Japan?".into(),
                options: vec!["Tokyo".into(), "Kyoto".into(), "Osaka".into(), "Nagoya".into()],
                correct_option: 0,
            },
            QuizQuestion {
                prompt: "What is the capital of Australia?".into(),
                options: vec![
                    "Sydney".into(),
                    "Melbourne".into(),
                    "Canberra".into(),
                    "Perth".into(),
                ],
                correct_option: 2,
            },
        ],
    }
}

fn oceans() -> QuizDocument {
    QuizDocument {
        id: "oceans".into(),
        title: "Oceans and Seas".into(),
        questions: vec![
            QuizQuestion {
                prompt: "Which is the largest ocean?".into(),
                options: vec!["Atlantic".into(), "Indian".into(), "Pacific".into()],
                correct_option: 2,
            },
            QuizQuestion {
                prompt: "Which sea has no coastline?".into(),
                options: vec![
                    "The Sargasso Sea".into(),
                    "The Caspian Sea".into(),
                    "The Dead Sea".into(),
                ],
                correct_option: 0,
            },
        ],
    }
}

#[tokio::main]
async fn main() -> Result<(), QuizforgeError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("trivia_night=info,quizforge=info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let server = QuizforgeServer::builder()
        .bind(&addr)
        .build(NumericAuth, Catalog::new(), MemoryStats::new())
        .await?;

    tracing::info!(%addr, "trivia night is on");
    server.run().await
}
