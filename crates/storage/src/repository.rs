use async_trait::async_trait;
use quiz_core::model::{ActorId, Quiz, QuizId, QuizResult, ResultDraft, ResultId, ValidatedQuiz};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Which slice of the results log to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFilter {
    ByQuiz(QuizId),
    ByActor(ActorId),
}

impl ResultFilter {
    #[must_use]
    pub fn matches(&self, result: &QuizResult) -> bool {
        match self {
            ResultFilter::ByQuiz(id) => result.quiz_id == *id,
            ResultFilter::ByActor(id) => result.actor_id == Some(*id),
        }
    }
}

/// Repository contract for quiz definitions.
///
/// Quizzes are immutable once inserted.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist a new quiz and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn insert_new_quiz(&self, quiz: ValidatedQuiz) -> Result<Quiz, StorageError>;

    /// Fetch a quiz by id. `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError>;

    /// List quizzes in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError>;
}

/// Append-only log of scored attempts.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Append a result and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz does not exist, or other
    /// storage errors.
    async fn append_result(&self, draft: ResultDraft) -> Result<QuizResult, StorageError>;

    /// Fetch a result by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError>;

    /// List results newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or decoding failures.
    async fn list_results(
        &self,
        filter: ResultFilter,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    results: Arc<Mutex<BTreeMap<ResultId, QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn next_id<K: Copy, V>(map: &BTreeMap<K, V>, value: impl Fn(K) -> u64) -> u64 {
    map.keys().next_back().map_or(1, |k| value(*k).saturating_add(1))
}

fn limit_usize(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn insert_new_quiz(&self, quiz: ValidatedQuiz) -> Result<Quiz, StorageError> {
        let mut guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = QuizId::new(next_id(&guard, |k: QuizId| k.value()));
        let quiz = quiz.assign_id(id);
        guard.insert(id, quiz.clone());
        Ok(quiz)
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let guard = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().take(limit_usize(limit)).cloned().collect())
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, draft: ResultDraft) -> Result<QuizResult, StorageError> {
        let quiz_known = self
            .quizzes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .contains_key(&draft.quiz_id);
        if !quiz_known {
            return Err(StorageError::NotFound);
        }

        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = ResultId::new(next_id(&guard, |k: ResultId| k.value()));
        let result = draft.assign_id(id);
        guard.insert(id, result.clone());
        Ok(result)
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        filter: ResultFilter,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<QuizResult> = guard
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.completed_at
                .cmp(&a.completed_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        out.truncate(limit_usize(limit));
        Ok(out)
    }
}

/// Aggregates quiz and result repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Self { quizzes, results }
    }
}
