use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use quiz_core::model::{Actor, Question, QuestionId, Quiz, QuizId, QuizResult, ResultDraft, Score};
use quiz_core::session::{Direction, QuizSession, ReviewEntry, SessionProgress, SessionStatus};
use storage::repository::{QuizRepository, ResultRepository};
use tracing::{debug, info};

use super::timer::{SessionTimer, SharedSession};
use crate::Clock;
use crate::error::AttemptError;
use crate::identity::IdentityProvider;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Point-in-time view of an attempt for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSnapshot {
    pub quiz_id: QuizId,
    pub status: SessionStatus,
    pub current_index: usize,
    pub question: Question,
    pub selected: Option<usize>,
    pub flagged: bool,
    pub remaining_secs: Option<u32>,
    pub progress: SessionProgress,
    pub score: Option<Score>,
}

/// One actor taking one quiz.
///
/// Owns the session and, for timed quizzes, the countdown that drives it.
/// Dropping the attempt stops the countdown.
pub struct Attempt {
    quiz: Arc<Quiz>,
    actor: Option<Actor>,
    session: SharedSession,
    timer: Option<SessionTimer>,
    result: Option<QuizResult>,
}

impl Attempt {
    fn lock(&self) -> Result<MutexGuard<'_, QuizSession>, AttemptError> {
        self.session
            .lock()
            .map_err(|_| AttemptError::SessionUnavailable)
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    /// The persisted result, once the attempt was submitted or finalized.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    /// # Errors
    ///
    /// Returns `AttemptError::SessionUnavailable` if the session lock is poisoned.
    pub fn status(&self) -> Result<SessionStatus, AttemptError> {
        Ok(self.lock()?.status())
    }

    /// # Errors
    ///
    /// Returns `AttemptError::Session` when the session is finished or the ids
    /// are invalid.
    pub fn select_answer(&self, question: QuestionId, option: usize) -> Result<(), AttemptError> {
        self.lock()?.select_answer(question, option)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Same as [`Attempt::select_answer`], for the question under the pointer.
    pub fn select_current(&self, option: usize) -> Result<(), AttemptError> {
        self.lock()?.select_current(option)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AttemptError::SessionUnavailable` if the session lock is poisoned.
    pub fn advance(&self, direction: Direction) -> Result<usize, AttemptError> {
        Ok(self.lock()?.advance(direction))
    }

    /// # Errors
    ///
    /// Returns `AttemptError::SessionUnavailable` if the session lock is poisoned.
    pub fn go_to(&self, index: usize) -> Result<usize, AttemptError> {
        Ok(self.lock()?.go_to(index))
    }

    /// # Errors
    ///
    /// Returns `AttemptError::Session` for unknown questions.
    pub fn toggle_flag(&self, question: QuestionId) -> Result<bool, AttemptError> {
        Ok(self.lock()?.toggle_flag(question)?)
    }

    /// # Errors
    ///
    /// Returns `AttemptError::SessionUnavailable` if the session lock is poisoned.
    pub fn toggle_current_flag(&self) -> Result<bool, AttemptError> {
        let mut session = self.lock()?;
        let id = session.current_question().id();
        Ok(session.toggle_flag(id)?)
    }

    /// # Errors
    ///
    /// Returns `AttemptError::SessionUnavailable` if the session lock is poisoned.
    pub fn snapshot(&self) -> Result<AttemptSnapshot, AttemptError> {
        let session = self.lock()?;
        let question = session.current_question().clone();
        Ok(AttemptSnapshot {
            quiz_id: self.quiz.id(),
            status: session.status(),
            current_index: session.current_index(),
            selected: session.answer_for(question.id()),
            flagged: session.is_flagged(question.id()),
            question,
            remaining_secs: session.remaining_secs(),
            progress: session.progress(),
            score: session.score().copied(),
        })
    }

    /// Question-by-question review of a finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFinished` while the session is still active.
    pub fn review(&self) -> Result<Vec<ReviewEntry>, AttemptError> {
        let session = self.lock()?;
        session.review().ok_or(AttemptError::NotFinished {
            status: session.status(),
        })
    }

    /// Waits until the countdown expires the session.
    ///
    /// Returns `false` straight away for untimed attempts, and when the timer
    /// was stopped before reaching zero.
    pub async fn wait_for_expiry(&mut self) -> bool {
        match self.timer.as_mut() {
            Some(timer) => timer.expired().await,
            None => false,
        }
    }

    /// Stops the countdown, if any.
    pub fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn start_timer(&mut self, period: Duration) {
        self.stop_timer();
        if self.quiz.time_limit_secs().is_some() {
            self.timer = Some(SessionTimer::spawn(Arc::clone(&self.session), period));
        }
    }
}

/// Orchestrates starting, submitting and persisting quiz attempts.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    results: Arc<dyn ResultRepository>,
    identity: Arc<dyn IdentityProvider>,
    tick_period: Duration,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        results: Arc<dyn ResultRepository>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            results,
            identity,
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }

    /// Override how often the countdown ticks. Each tick deducts one second.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Start an attempt on the given quiz for the current actor.
    ///
    /// Timed quizzes start counting down immediately; this must run inside a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::QuizNotFound` if the quiz does not exist.
    pub async fn start_attempt(&self, quiz_id: QuizId) -> Result<Attempt, AttemptError> {
        let quiz = self
            .quizzes
            .get_quiz(quiz_id)
            .await?
            .ok_or(AttemptError::QuizNotFound(quiz_id))?;
        let quiz = Arc::new(quiz);
        let actor = self.identity.current_actor();
        let session = QuizSession::start(Arc::clone(&quiz), self.clock.now());

        let mut attempt = Attempt {
            quiz,
            actor,
            session: Arc::new(Mutex::new(session)),
            timer: None,
            result: None,
        };
        attempt.start_timer(self.tick_period);

        debug!(
            quiz_id = %quiz_id,
            time_limit_secs = ?attempt.quiz.time_limit_secs(),
            actor = ?attempt.actor.as_ref().map(|a| a.id),
            "attempt started"
        );
        Ok(attempt)
    }

    /// Submit an active attempt, score it and append the result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Session` if the session already finished (use
    /// [`AttemptService::finalize`] for expired attempts), or storage errors.
    pub async fn submit(&self, attempt: &mut Attempt) -> Result<QuizResult, AttemptError> {
        attempt.stop_timer();
        let now = self.clock.now();
        let score = *attempt.lock()?.complete(now)?;
        info!(
            quiz_id = %attempt.quiz.id(),
            correct = score.correct_answers,
            total = score.total_questions,
            percentage = score.percentage,
            "attempt submitted"
        );
        self.persist(attempt, score).await
    }

    /// Persist the result of a finished attempt.
    ///
    /// Calling it again returns the already-persisted result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotFinished` while the session is still active,
    /// or storage errors.
    pub async fn finalize(&self, attempt: &mut Attempt) -> Result<QuizResult, AttemptError> {
        if let Some(result) = attempt.result() {
            return Ok(result.clone());
        }

        let score = {
            let session = attempt.lock()?;
            match session.score() {
                Some(score) => *score,
                None => {
                    return Err(AttemptError::NotFinished {
                        status: session.status(),
                    });
                }
            }
        };
        attempt.stop_timer();
        info!(
            quiz_id = %attempt.quiz.id(),
            percentage = score.percentage,
            completion = score.completion.as_str(),
            "attempt finalized"
        );
        self.persist(attempt, score).await
    }

    async fn persist(&self, attempt: &mut Attempt, score: Score) -> Result<QuizResult, AttemptError> {
        let draft = ResultDraft {
            quiz_id: attempt.quiz.id(),
            actor_id: attempt.actor.as_ref().map(|a| a.id),
            score,
            completed_at: self.clock.now(),
        };
        let result = self.results.append_result(draft).await?;
        debug!(result_id = %result.id, "result appended");
        attempt.result = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use quiz_core::model::{ActorId, Completion, QuestionDraft, QuizDraft};
    use quiz_core::session::SessionError;
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, ResultFilter};

    async fn setup(time_limit_secs: Option<u32>) -> (AttemptService, InMemoryRepository, QuizId) {
        let repo = InMemoryRepository::new();
        let quiz = repo
            .insert_new_quiz(
                QuizDraft {
                    title: "JavaScript Basics".into(),
                    description: "Fundamentals".into(),
                    time_limit_secs,
                    questions: vec![
                        QuestionDraft::new("var?", &["Declares a variable", "Creates a function"], 0),
                        QuestionDraft::new("Not a type?", &["String", "Integer"], 1),
                    ],
                }
                .validate(None, fixed_now())
                .unwrap(),
            )
            .await
            .unwrap();

        let actor = Actor::new(ActorId::new(5), "Taker", "taker@example.com");
        let service = AttemptService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(StaticIdentity::signed_in(actor)),
        );
        (service, repo, quiz.id())
    }

    #[tokio::test]
    async fn unknown_quiz_rejected() {
        let (service, _repo, _) = setup(None).await;
        let err = service.start_attempt(QuizId::new(77)).await.err().unwrap();
        assert!(matches!(err, AttemptError::QuizNotFound(id) if id == QuizId::new(77)));
    }

    #[tokio::test]
    async fn submit_persists_result_for_actor() {
        let (service, repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();

        attempt.select_current(0).unwrap();
        assert_eq!(attempt.advance(Direction::Next).unwrap(), 1);
        attempt.select_current(0).unwrap();

        let result = service.submit(&mut attempt).await.unwrap();
        assert_eq!(result.actor_id, Some(ActorId::new(5)));
        assert_eq!(result.score.correct_answers, 1);
        assert_eq!(result.score.total_answered, 2);
        assert_eq!(result.score.percentage, 50);
        assert_eq!(result.score.completion, Completion::Submitted);
        assert_eq!(attempt.status().unwrap(), SessionStatus::Completed);

        let stored = repo
            .list_results(ResultFilter::ByQuiz(quiz_id), 10)
            .await
            .unwrap();
        assert_eq!(stored, vec![result]);
    }

    #[tokio::test]
    async fn second_submit_is_rejected() {
        let (service, _repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();
        service.submit(&mut attempt).await.unwrap();

        let err = service.submit(&mut attempt).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Session(SessionError::NotActive {
                status: SessionStatus::Completed
            })
        ));
        assert!(attempt.select_current(1).is_err());
    }

    #[tokio::test]
    async fn finalize_requires_finished_session() {
        let (service, _repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();
        let err = service.finalize(&mut attempt).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::NotFinished {
                status: SessionStatus::Active
            }
        ));
    }

    #[tokio::test]
    async fn finalize_after_submit_returns_same_result() {
        let (service, repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();
        let submitted = service.submit(&mut attempt).await.unwrap();
        let finalized = service.finalize(&mut attempt).await.unwrap();
        assert_eq!(submitted, finalized);
        assert_eq!(
            repo.list_results(ResultFilter::ByQuiz(quiz_id), 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn untimed_attempt_has_no_expiry() {
        let (service, _repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();
        assert!(!attempt.wait_for_expiry().await);
        assert_eq!(attempt.snapshot().unwrap().remaining_secs, None);
    }

    #[tokio::test]
    async fn snapshot_reflects_current_question() {
        let (service, _repo, quiz_id) = setup(Some(60)).await;
        let attempt = service.start_attempt(quiz_id).await.unwrap();
        attempt.go_to(1).unwrap();
        attempt.select_current(1).unwrap();
        assert!(attempt.toggle_current_flag().unwrap());

        let snap = attempt.snapshot().unwrap();
        assert_eq!(snap.quiz_id, quiz_id);
        assert_eq!(snap.current_index, 1);
        assert_eq!(snap.question.prompt(), "Not a type?");
        assert_eq!(snap.selected, Some(1));
        assert!(snap.flagged);
        assert_eq!(snap.progress.answered, 1);
        assert_eq!(snap.status, SessionStatus::Active);
        assert!(snap.score.is_none());
    }

    #[tokio::test]
    async fn review_follows_submit() {
        let (service, _repo, quiz_id) = setup(None).await;
        let mut attempt = service.start_attempt(quiz_id).await.unwrap();
        attempt.select_current(0).unwrap();
        assert!(matches!(
            attempt.review().unwrap_err(),
            AttemptError::NotFinished {
                status: SessionStatus::Active
            }
        ));

        service.submit(&mut attempt).await.unwrap();
        let review = attempt.review().unwrap();
        assert_eq!(review.len(), 2);
        assert!(review[0].is_correct);
        assert_eq!(review[1].selected, None);
        assert_eq!(review[1].correct, 1);
    }
}
