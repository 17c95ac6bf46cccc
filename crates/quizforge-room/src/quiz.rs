//! Quiz content types and the provider hook that supplies them.
//!
//! The engine never stores quiz content itself — a [`QuizProvider`]
//! resolves a quiz id to an immutable [`QuizDocument`] exactly once, at
//! room creation. After that the document is owned by the room actor and
//! nothing can mutate it mid-game.

use quizforge_protocol::QuestionView;

/// One multiple-choice question, including the answer key.
///
/// This is the server-side form. `correct_option` never goes on the wire
/// while the question is live; [`QuizQuestion::view`] strips it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_option: usize,
}

impl QuizQuestion {
    /// The client-visible projection: prompt and options only.
    pub fn view(&self) -> QuestionView {
        QuestionView {
            question: self.prompt.clone(),
            options: self.options.clone(),
        }
    }
}

/// An immutable quiz, resolved once at room creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDocument {
    pub id: String,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl QuizDocument {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Errors a [`QuizProvider`] can return.
#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    /// No quiz with the given id.
    #[error("quiz {0:?} not found")]
    NotFound(String),

    /// The backing store failed (database down, catalog unreadable).
    #[error("quiz store unavailable: {0}")]
    Unavailable(String),
}

/// Resolves quiz ids to quiz content.
///
/// Implement this over whatever holds your quizzes — a database, a CMS,
/// or a static in-memory catalog (see the trivia-night demo). Called by
/// the gateway before any room exists, so a slow or failing lookup never
/// blocks a running room.
pub trait QuizProvider: Send + Sync + 'static {
    /// Fetches the quiz with the given id.
    ///
    /// # Returns
    /// - `Ok(QuizDocument)` — the full quiz, including answer keys
    /// - `Err(QuizError::NotFound)` — unknown id; room creation is aborted
    fn fetch(
        &self,
        quiz_id: &str,
    ) -> impl std::future::Future<Output = Result<QuizDocument, QuizError>> + Send;
}
