use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::actor::Author;
use crate::model::ids::{QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("time limit must be greater than zero")]
    ZeroTimeLimit,

    #[error("duplicate question id {id}")]
    DuplicateQuestion { id: QuestionId },

    #[error("question {id} prompt cannot be empty")]
    EmptyPrompt { id: QuestionId },

    #[error("question {id} needs at least two options, got {count}")]
    TooFewOptions { id: QuestionId, count: usize },

    #[error("question {id} option {index} has empty text")]
    EmptyOption { id: QuestionId, index: usize },

    #[error("question {id} correct option {index} is out of range")]
    CorrectOutOfRange { id: QuestionId, index: usize },
}

//
// ─── OPTION ────────────────────────────────────────────────────────────────────
//

/// A selectable answer for a question.
///
/// Correctness is not stored here; it is derived from the owning
/// question's correct index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    label: String,
    text: String,
}

impl QuizOption {
    #[must_use]
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// Builds an option labelled by its position (`a`, `b`, ...).
    #[must_use]
    pub fn positional(index: usize, text: impl Into<String>) -> Self {
        Self::new(option_label(index), text)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Label for the option at `index`: `a`..`z`, then the 1-based position.
#[must_use]
pub fn option_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'a' + i).to_string(),
        _ => (index + 1).to_string(),
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Canonical multiple-choice question with exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<QuizOption>,
    correct: usize,
}

impl Question {
    /// Creates a question.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the prompt or any option is blank, if fewer than two
    /// options are given, or if `correct` does not index an option.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<QuizOption>,
        correct: usize,
    ) -> Result<Self, QuizError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt { id });
        }
        if options.len() < 2 {
            return Err(QuizError::TooFewOptions {
                id,
                count: options.len(),
            });
        }
        if let Some(index) = options.iter().position(|o| o.text.trim().is_empty()) {
            return Err(QuizError::EmptyOption { id, index });
        }
        if correct >= options.len() {
            return Err(QuizError::CorrectOutOfRange { id, index: correct });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&QuizOption> {
        self.options.get(index)
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn correct_option(&self) -> &QuizOption {
        &self.options[self.correct]
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct
    }

    /// Finds the position of the option carrying `label`.
    #[must_use]
    pub fn option_index(&self, label: &str) -> Option<usize> {
        self.options.iter().position(|o| o.label == label)
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// An immutable quiz definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: String,
    time_limit_secs: Option<u32>,
    questions: Vec<Question>,
    author: Option<Author>,
    created_at: DateTime<Utc>,
}

impl Quiz {
    /// Creates a quiz from already-built questions.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` if the title is blank, the time limit is zero, there
    /// are no questions, or question ids repeat.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        description: impl Into<String>,
        time_limit_secs: Option<u32>,
        questions: Vec<Question>,
        author: Option<Author>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if time_limit_secs == Some(0) {
            return Err(QuizError::ZeroTimeLimit);
        }
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        for (i, q) in questions.iter().enumerate() {
            if questions[..i].iter().any(|p| p.id == q.id) {
                return Err(QuizError::DuplicateQuestion { id: q.id });
            }
        }

        Ok(Self {
            id,
            title,
            description: description.into(),
            time_limit_secs,
            questions,
            author,
            created_at,
        })
    }

    /// Assembles a quiz whose parts were already checked by draft validation
    /// or ingestion.
    pub(crate) fn from_checked_parts(
        id: QuizId,
        title: String,
        description: String,
        time_limit_secs: Option<u32>,
        questions: Vec<Question>,
        author: Option<Author>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            time_limit_secs,
            questions,
            author,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared time limit in seconds; `None` for untimed quizzes.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    #[must_use]
    pub fn position_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id == id)
    }

    #[must_use]
    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Case-insensitive title match used by the quiz listing.
    #[must_use]
    pub fn title_matches(&self, term: &str) -> bool {
        self.title.to_lowercase().contains(&term.trim().to_lowercase())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
