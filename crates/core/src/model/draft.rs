use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::actor::Author;
use crate::model::ids::{QuestionId, QuizId};
use crate::model::quiz::{Question, Quiz, QuizError, QuizOption};

//
// ─── DRAFT TYPES ───────────────────────────────────────────────────────────────
//

/// A quiz under authoring. Nothing here is checked until `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuizDraft {
    pub title: String,
    pub description: String,
    pub time_limit_secs: Option<u32>,
    pub questions: Vec<QuestionDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(prompt: impl Into<String>, options: &[&str], correct_answer: usize) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct_answer,
        }
    }
}

impl Default for QuestionDraft {
    /// Blank question with four empty option slots, as the authoring form starts.
    fn default() -> Self {
        Self {
            prompt: String::new(),
            options: vec![String::new(); 4],
            correct_answer: 0,
        }
    }
}

//
// ─── VALIDATION ERRORS ─────────────────────────────────────────────────────────
//

/// First authoring violation found in a draft.
///
/// The `Display` text is meant to be shown to the author as-is. Question
/// numbers are 1-based.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DraftError {
    #[error("Quiz title is required")]
    MissingTitle,

    #[error("Quiz description is required")]
    MissingDescription,

    #[error("Quiz must have at least one question")]
    NoQuestions,

    #[error("Question {number} is required")]
    MissingPrompt { number: usize },

    #[error("Question {number} must have at least 2 options")]
    TooFewOptions { number: usize },

    #[error("Question {number} correct answer is out of range")]
    CorrectAnswerOutOfRange { number: usize },

    #[error("Question {number} correct answer cannot be empty")]
    EmptyCorrectAnswer { number: usize },

    #[error("Time limit must be greater than zero")]
    ZeroTimeLimit,

    #[error(transparent)]
    Invalid(#[from] QuizError),
}

impl QuizDraft {
    /// Returns the first violation, or `Ok(())` when the draft can be accepted.
    ///
    /// # Errors
    ///
    /// Returns the first `DraftError` in authoring order.
    pub fn check(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingTitle);
        }
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingDescription);
        }
        if self.questions.is_empty() {
            return Err(DraftError::NoQuestions);
        }

        for (i, question) in self.questions.iter().enumerate() {
            let number = i + 1;
            if question.prompt.trim().is_empty() {
                return Err(DraftError::MissingPrompt { number });
            }

            let filled = question
                .options
                .iter()
                .filter(|o| !o.trim().is_empty())
                .count();
            if filled < 2 {
                return Err(DraftError::TooFewOptions { number });
            }

            let Some(correct) = question.options.get(question.correct_answer) else {
                return Err(DraftError::CorrectAnswerOutOfRange { number });
            };
            if correct.trim().is_empty() {
                return Err(DraftError::EmptyCorrectAnswer { number });
            }
        }

        if self.time_limit_secs == Some(0) {
            return Err(DraftError::ZeroTimeLimit);
        }

        Ok(())
    }

    /// Validate the draft into its canonical form.
    ///
    /// Blank option slots are dropped and the correct index is remapped onto the
    /// remaining options. Questions get ids `1..=n` in order.
    ///
    /// # Errors
    ///
    /// Returns the first `DraftError` found by `check`.
    pub fn validate(
        self,
        author: Option<Author>,
        now: DateTime<Utc>,
    ) -> Result<ValidatedQuiz, DraftError> {
        self.check()?;

        let mut questions = Vec::with_capacity(self.questions.len());
        for (i, draft) in self.questions.into_iter().enumerate() {
            let number = i + 1;
            let mut options = Vec::with_capacity(draft.options.len());
            let mut correct = None;
            for (pos, text) in draft.options.into_iter().enumerate() {
                if text.trim().is_empty() {
                    continue;
                }
                if pos == draft.correct_answer {
                    correct = Some(options.len());
                }
                options.push(QuizOption::positional(options.len(), text));
            }
            let correct = correct.ok_or(DraftError::EmptyCorrectAnswer { number })?;
            let id = QuestionId::new(u64::try_from(number).unwrap_or(u64::MAX));
            questions.push(Question::new(id, draft.prompt, options, correct)?);
        }

        Ok(ValidatedQuiz {
            title: self.title,
            description: self.description,
            time_limit_secs: self.time_limit_secs,
            questions,
            author,
            created_at: now,
        })
    }
}

//
// ─── VALIDATED QUIZ ────────────────────────────────────────────────────────────
//

/// A quiz that passed validation but has no repository id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuiz {
    title: String,
    description: String,
    time_limit_secs: Option<u32>,
    questions: Vec<Question>,
    author: Option<Author>,
    created_at: DateTime<Utc>,
}

impl ValidatedQuiz {
    pub(crate) fn from_checked_parts(
        title: String,
        description: String,
        time_limit_secs: Option<u32>,
        questions: Vec<Question>,
        author: Option<Author>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            description,
            time_limit_secs,
            questions,
            author,
            created_at,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn assign_id(self, id: QuizId) -> Quiz {
        Quiz::from_checked_parts(
            id,
            self.title,
            self.description,
            self.time_limit_secs,
            self.questions,
            self.author,
            self.created_at,
        )
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
