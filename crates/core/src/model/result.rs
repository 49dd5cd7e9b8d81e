use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ActorId, QuizId, ResultId};

/// How a session reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// The actor submitted manually.
    Submitted,
    /// The countdown reached zero.
    TimedOut,
}

impl Completion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Completion::Submitted => "submitted",
            Completion::TimedOut => "timed_out",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(Completion::Submitted),
            "timed_out" => Some(Completion::TimedOut),
            _ => None,
        }
    }
}

/// Scored outcome of a finished session.
///
/// `percentage` is computed over `total_questions`, so unanswered questions
/// count against it exactly like wrong answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct_answers: u32,
    pub total_answered: u32,
    pub total_questions: u32,
    pub percentage: u8,
    pub time_spent_secs: u32,
    pub completion: Completion,
}

/// A score ready to be appended to the results log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDraft {
    pub quiz_id: QuizId,
    pub actor_id: Option<ActorId>,
    pub score: Score,
    pub completed_at: DateTime<Utc>,
}

impl ResultDraft {
    #[must_use]
    pub fn assign_id(self, id: ResultId) -> QuizResult {
        QuizResult {
            id,
            quiz_id: self.quiz_id,
            actor_id: self.actor_id,
            score: self.score,
            completed_at: self.completed_at,
        }
    }
}

/// Persisted outcome of a finished session. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub id: ResultId,
    pub quiz_id: QuizId,
    pub actor_id: Option<ActorId>,
    pub score: Score,
    pub completed_at: DateTime<Utc>,
}
