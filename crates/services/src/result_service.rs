use std::sync::Arc;

use quiz_core::model::{ActorId, QuizId, QuizResult, ResultId};
use storage::repository::{ResultFilter, ResultRepository};

use crate::error::ResultServiceError;

/// Read side of the results log.
#[derive(Clone)]
pub struct ResultService {
    results: Arc<dyn ResultRepository>,
}

impl ResultService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Results for one quiz, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Storage` if repository access fails.
    pub async fn results_for_quiz(
        &self,
        quiz_id: QuizId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, ResultServiceError> {
        Ok(self
            .results
            .list_results(ResultFilter::ByQuiz(quiz_id), limit)
            .await?)
    }

    /// Results recorded for one actor, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ResultServiceError::Storage` if repository access fails.
    pub async fn results_for_actor(
        &self,
        actor_id: ActorId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, ResultServiceError> {
        Ok(self
            .results
            .list_results(ResultFilter::ByActor(actor_id), limit)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `ResultServiceError::Storage` (including `NotFound`) on failure.
    pub async fn get_result(&self, id: ResultId) -> Result<QuizResult, ResultServiceError> {
        Ok(self.results.get_result(id).await?)
    }
}
