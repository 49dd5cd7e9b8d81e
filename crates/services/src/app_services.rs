use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::attempts::AttemptService;
use crate::error::AppServicesError;
use crate::identity::IdentityProvider;
use crate::quiz_service::QuizService;
use crate::result_service::ResultService;
use crate::samples::SAMPLE_QUIZZES_JSON;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    seeded: bool,
    quiz_service: Arc<QuizService>,
    attempt_service: Arc<AttemptService>,
    result_service: Arc<ResultService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or sample seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, identity).await
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if sample seeding fails.
    pub async fn in_memory(
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, identity).await
    }

    /// Wire services over an existing storage, seeding samples when it holds no quizzes.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the store cannot be read or seeded.
    pub async fn from_storage(
        storage: Storage,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let quiz_service = Arc::new(QuizService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&identity),
        ));
        let attempt_service = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.quizzes),
            Arc::clone(&storage.results),
            identity,
        ));
        let result_service = Arc::new(ResultService::new(Arc::clone(&storage.results)));

        let seeded = ensure_samples(&quiz_service).await? > 0;

        Ok(Self {
            seeded,
            quiz_service,
            attempt_service,
            result_service,
        })
    }

    /// Replace the attempt service's tick period.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        let attempts = self.attempt_service.as_ref().clone().with_tick_period(period);
        self.attempt_service = Arc::new(attempts);
        self
    }

    /// Whether sample quizzes were inserted during construction.
    #[must_use]
    pub fn seeded(&self) -> bool {
        self.seeded
    }

    /// Insert the sample quizzes if the store holds none. Returns how many were
    /// added; a store that already has quizzes is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the store cannot be read or written.
    pub async fn seed_samples(&self) -> Result<usize, AppServicesError> {
        ensure_samples(&self.quiz_service).await
    }

    #[must_use]
    pub fn quiz_service(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz_service)
    }

    #[must_use]
    pub fn attempt_service(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempt_service)
    }

    #[must_use]
    pub fn result_service(&self) -> Arc<ResultService> {
        Arc::clone(&self.result_service)
    }
}

async fn ensure_samples(quizzes: &QuizService) -> Result<usize, AppServicesError> {
    if !quizzes.list_quizzes(1).await?.is_empty() {
        return Ok(0);
    }
    let imported = quizzes.import_json(SAMPLE_QUIZZES_JSON).await?;
    info!(count = imported.len(), "seeded sample quizzes");
    Ok(imported.len())
}
