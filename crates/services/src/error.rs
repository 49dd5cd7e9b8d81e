//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{DraftError, IngestError, QuizId};
use quiz_core::session::{SessionError, SessionStatus};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("quiz {0} not found")]
    NotFound(QuizId),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("invalid quiz json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AttemptService` and `Attempt`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("quiz {0} not found")]
    QuizNotFound(QuizId),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("attempt is still {status}")]
    NotFinished { status: SessionStatus },
    #[error("session state is unavailable")]
    SessionUnavailable,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ResultService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Quiz(#[from] QuizServiceError),
}
