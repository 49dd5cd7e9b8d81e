use std::sync::Arc;

use quiz_core::model::{Quiz, QuizDraft, QuizId, QuizRecord};
use serde::Deserialize;
use storage::repository::QuizRepository;
use tracing::{debug, info};

use crate::Clock;
use crate::error::QuizServiceError;
use crate::identity::IdentityProvider;

/// Upper bound on how many quizzes a title search scans.
const SEARCH_SCAN_LIMIT: u32 = 10_000;

/// Import payloads may hold one quiz or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Many(Vec<QuizRecord>),
    One(Box<QuizRecord>),
}

/// Orchestrates quiz authoring, lookup and import.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    identity: Arc<dyn IdentityProvider>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            identity,
        }
    }

    /// Validate a draft, attribute it to the current actor and persist it.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Draft` with the first authoring violation.
    /// Returns `QuizServiceError::Storage` if persistence fails.
    pub async fn create_quiz(&self, draft: QuizDraft) -> Result<Quiz, QuizServiceError> {
        let author = self.identity.current_actor().map(|a| a.as_author());
        let validated = draft.validate(author, self.clock.now())?;
        let quiz = self.quizzes.insert_new_quiz(validated).await?;
        info!(quiz_id = %quiz.id(), title = quiz.title(), "quiz created");
        Ok(quiz)
    }

    /// Fetch a quiz by id.
    ///
    /// Returns `Ok(None)` when the quiz does not exist.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, QuizServiceError> {
        Ok(self.quizzes.get_quiz(id).await?)
    }

    /// Fetch a quiz that must exist.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::NotFound` when missing.
    pub async fn require_quiz(&self, id: QuizId) -> Result<Quiz, QuizServiceError> {
        self.get_quiz(id)
            .await?
            .ok_or(QuizServiceError::NotFound(id))
    }

    /// List quizzes ordered by id, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, QuizServiceError> {
        Ok(self.quizzes.list_quizzes(limit).await?)
    }

    /// Case-insensitive title search. A blank term matches everything.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if repository access fails.
    pub async fn search_quizzes(
        &self,
        term: &str,
        limit: u32,
    ) -> Result<Vec<Quiz>, QuizServiceError> {
        let all = self.quizzes.list_quizzes(SEARCH_SCAN_LIMIT).await?;
        Ok(all
            .into_iter()
            .filter(|q| q.title_matches(term))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    /// Import quizzes from JSON in either question shape.
    ///
    /// Every record is validated before any is stored, so a bad record leaves
    /// the repository untouched.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Json` for malformed input,
    /// `QuizServiceError::Ingest` for invalid records, or storage errors.
    pub async fn import_json(&self, json: &str) -> Result<Vec<Quiz>, QuizServiceError> {
        let records = match serde_json::from_str::<ImportPayload>(json) {
            Ok(ImportPayload::Many(records)) => records,
            Ok(ImportPayload::One(record)) => vec![*record],
            // Re-parse as a single record so the error points at the real problem.
            Err(_) => vec![serde_json::from_str::<QuizRecord>(json)?],
        };

        let now = self.clock.now();
        let validated = records
            .into_iter()
            .map(|r| r.into_validated(now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut stored = Vec::with_capacity(validated.len());
        for quiz in validated {
            let quiz = self.quizzes.insert_new_quiz(quiz).await?;
            debug!(quiz_id = %quiz.id(), title = quiz.title(), "quiz imported");
            stored.push(quiz);
        }
        info!(count = stored.len(), "import finished");
        Ok(stored)
    }
}
