use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Completion, Question, QuestionId, Quiz, Score};
use crate::scoring::{percent, score_answers};
use crate::time::elapsed_secs;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is {status}, not active")]
    NotActive { status: SessionStatus },

    #[error("question {id} is not part of this quiz")]
    UnknownQuestion { id: QuestionId },

    #[error("question {question} has {count} options, index {index} is out of range")]
    OptionOutOfRange {
        question: QuestionId,
        index: usize,
        count: usize,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a session. `Completed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Expired,
}

impl SessionStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// What a single timer tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time was deducted and some remains.
    Running { remaining_secs: u32 },
    /// This tick used up the last second; the session is now expired and scored.
    Expired,
    /// The quiz has no time limit; nothing changed.
    Untimed,
    /// The session already finished; nothing changed.
    Inactive,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub current_index: usize,
    pub answered_percentage: u8,
}

/// One question as reviewed after the session has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewEntry {
    pub question: Question,
    pub selected: Option<usize>,
    pub correct: usize,
    pub is_correct: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One attempt at a quiz.
///
/// Every operation is synchronous and returns immediately. A timed session is
/// driven by calling [`QuizSession::tick`] once per second from outside.
#[derive(Clone)]
pub struct QuizSession {
    quiz: Arc<Quiz>,
    current: usize,
    answers: HashMap<QuestionId, usize>,
    flagged: BTreeSet<QuestionId>,
    remaining_secs: Option<u32>,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    score: Option<Score>,
}

impl QuizSession {
    /// Starts an active session positioned on the first question.
    ///
    /// `started_at` should come from the services layer clock; it is only used
    /// to measure time spent on untimed quizzes.
    #[must_use]
    pub fn start(quiz: Arc<Quiz>, started_at: DateTime<Utc>) -> Self {
        let remaining_secs = quiz.time_limit_secs();
        Self {
            quiz,
            current: 0,
            answers: HashMap::new(),
            flagged: BTreeSet::new(),
            remaining_secs,
            status: SessionStatus::Active,
            started_at,
            score: None,
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Seconds left on the countdown; `None` for untimed quizzes.
    #[must_use]
    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.current]
    }

    #[must_use]
    pub fn answer_for(&self, question: QuestionId) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    #[must_use]
    pub fn answers(&self) -> &HashMap<QuestionId, usize> {
        &self.answers
    }

    #[must_use]
    pub fn is_flagged(&self, question: QuestionId) -> bool {
        self.flagged.contains(&question)
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<QuestionId> {
        &self.flagged
    }

    /// The score, once the session has finished.
    #[must_use]
    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.quiz.question_count();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            flagged: self.flagged.len(),
            current_index: self.current,
            answered_percentage: percent(
                u32::try_from(answered).unwrap_or(u32::MAX),
                u32::try_from(total).unwrap_or(u32::MAX),
            ),
        }
    }

    /// Per-question answers next to the correct option, in quiz order.
    ///
    /// `None` while the session is still active.
    #[must_use]
    pub fn review(&self) -> Option<Vec<ReviewEntry>> {
        if self.is_active() {
            return None;
        }
        let entries = self
            .quiz
            .questions()
            .iter()
            .map(|q| {
                let selected = self.answer_for(q.id());
                let correct = q.correct_index();
                ReviewEntry {
                    question: q.clone(),
                    selected,
                    correct,
                    is_correct: selected == Some(correct),
                }
            })
            .collect();
        Some(entries)
    }

    /// Records (or overwrites) the chosen option for a question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` once the session has finished, leaving
    /// the answers untouched. Returns `UnknownQuestion` / `OptionOutOfRange` for
    /// ids that do not exist in the quiz.
    pub fn select_answer(
        &mut self,
        question: QuestionId,
        option: usize,
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        let q = self
            .quiz
            .question(question)
            .ok_or(SessionError::UnknownQuestion { id: question })?;
        if option >= q.options().len() {
            return Err(SessionError::OptionOutOfRange {
                question,
                index: option,
                count: q.options().len(),
            });
        }
        self.answers.insert(question, option);
        Ok(())
    }

    /// Records an answer for the question under the pointer.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::select_answer`].
    pub fn select_current(&mut self, option: usize) -> Result<(), SessionError> {
        let question = self.current_question().id();
        self.select_answer(question, option)
    }

    /// Moves the pointer one step, stopping at either end. Ignored once finished.
    pub fn advance(&mut self, direction: Direction) -> usize {
        let target = match direction {
            Direction::Next => self.current.saturating_add(1),
            Direction::Previous => self.current.saturating_sub(1),
        };
        self.go_to(target)
    }

    /// Jumps to `index`, clamped to the last question. Ignored once finished.
    pub fn go_to(&mut self, index: usize) -> usize {
        if self.is_active() {
            let last = self.quiz.question_count().saturating_sub(1);
            self.current = index.min(last);
        }
        self.current
    }

    /// Flags or unflags a question for review. Returns whether it is now flagged.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` for ids outside the quiz.
    pub fn toggle_flag(&mut self, question: QuestionId) -> Result<bool, SessionError> {
        if self.quiz.question(question).is_none() {
            return Err(SessionError::UnknownQuestion { id: question });
        }
        if self.flagged.remove(&question) {
            Ok(false)
        } else {
            self.flagged.insert(question);
            Ok(true)
        }
    }

    /// Deducts one second from the countdown.
    ///
    /// Reaching zero expires the session and scores whatever answers are
    /// recorded at that instant.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Inactive;
        }
        let Some(remaining) = self.remaining_secs else {
            return TickOutcome::Untimed;
        };

        let remaining = remaining.saturating_sub(1);
        self.remaining_secs = Some(remaining);
        if remaining > 0 {
            return TickOutcome::Running {
                remaining_secs: remaining,
            };
        }

        let spent = self.quiz.time_limit_secs().unwrap_or(0);
        self.finish(SessionStatus::Expired, spent, Completion::TimedOut);
        TickOutcome::Expired
    }

    /// Submits the session manually and scores it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` if the session already finished,
    /// including by expiry; the existing score is left as it was.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<&Score, SessionError> {
        self.ensure_active()?;
        let spent = match (self.quiz.time_limit_secs(), self.remaining_secs) {
            (Some(limit), Some(remaining)) => limit.saturating_sub(remaining),
            _ => elapsed_secs(self.started_at, now),
        };
        Ok(self.finish(SessionStatus::Completed, spent, Completion::Submitted))
    }

    fn finish(&mut self, status: SessionStatus, spent: u32, completion: Completion) -> &Score {
        self.status = status;
        self.score
            .insert(score_answers(&self.quiz, &self.answers, spent, completion))
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SessionError::NotActive {
                status: self.status,
            })
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz.id())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("flagged_len", &self.flagged.len())
            .field("remaining_secs", &self.remaining_secs)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuizDraft, QuizId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn quiz(n: usize, time_limit_secs: Option<u32>) -> Arc<Quiz> {
        let quiz = QuizDraft {
            title: "Health & Wellness Quiz".into(),
            description: "Test your knowledge".into(),
            time_limit_secs,
            questions: (0..n)
                .map(|i| QuestionDraft::new(format!("Q{}", i + 1), &["a", "b", "c", "d"], 1))
                .collect(),
        }
        .validate(None, fixed_now())
        .unwrap()
        .assign_id(QuizId::new(1));
        Arc::new(quiz)
    }

    fn qid(n: u64) -> QuestionId {
        QuestionId::new(n)
    }

    #[test]
    fn starts_active_on_first_question() {
        let session = QuizSession::start(quiz(3, Some(60)), fixed_now());
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.remaining_secs(), Some(60));
        assert!(session.score().is_none());
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = QuizSession::start(quiz(3, None), fixed_now());
        let moves = [
            Direction::Previous,
            Direction::Previous,
            Direction::Next,
            Direction::Next,
            Direction::Next,
            Direction::Next,
            Direction::Previous,
        ];
        let mut seen = Vec::new();
        for m in moves {
            seen.push(session.advance(m));
        }
        assert_eq!(seen, vec![0, 0, 1, 2, 2, 2, 1]);
        assert_eq!(session.go_to(100), 2);
        assert_eq!(session.go_to(0), 0);
    }

    #[test]
    fn navigation_never_touches_answers() {
        let mut session = QuizSession::start(quiz(3, None), fixed_now());
        session.select_current(2).unwrap();
        session.advance(Direction::Next);
        session.go_to(0);
        assert_eq!(session.answer_for(qid(1)), Some(2));
        assert_eq!(session.answers().len(), 1);
    }

    #[test]
    fn select_overwrites_previous_choice() {
        let mut session = QuizSession::start(quiz(2, None), fixed_now());
        session.select_answer(qid(2), 0).unwrap();
        session.select_answer(qid(2), 3).unwrap();
        assert_eq!(session.answer_for(qid(2)), Some(3));
        assert_eq!(session.progress().answered, 1);
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let mut session = QuizSession::start(quiz(2, None), fixed_now());
        assert_eq!(
            session.select_answer(qid(9), 0),
            Err(SessionError::UnknownQuestion { id: qid(9) })
        );
        assert_eq!(
            session.select_answer(qid(1), 4),
            Err(SessionError::OptionOutOfRange {
                question: qid(1),
                index: 4,
                count: 4
            })
        );
        assert!(session.answers().is_empty());
    }

    #[test]
    fn terminal_session_ignores_answers_and_navigation() {
        let mut session = QuizSession::start(quiz(3, None), fixed_now());
        session.select_answer(qid(1), 1).unwrap();
        session.complete(fixed_now()).unwrap();

        let err = session.select_answer(qid(1), 0).unwrap_err();
        assert_eq!(
            err,
            SessionError::NotActive {
                status: SessionStatus::Completed
            }
        );
        assert_eq!(session.answer_for(qid(1)), Some(1));
        assert!(session.select_answer(qid(2), 1).is_err());
        assert_eq!(session.answers().len(), 1);
        assert_eq!(session.advance(Direction::Next), 0);
    }

    #[test]
    fn flag_then_unflag_restores_set() {
        let mut session = QuizSession::start(quiz(3, None), fixed_now());
        session.toggle_flag(qid(3)).unwrap();
        let before = session.flagged().clone();

        assert!(session.toggle_flag(qid(1)).unwrap());
        assert!(session.is_flagged(qid(1)));
        assert!(!session.toggle_flag(qid(1)).unwrap());

        assert_eq!(session.flagged(), &before);
        assert!(session.toggle_flag(qid(7)).is_err());
    }

    #[test]
    fn all_correct_scores_full_marks() {
        let mut session = QuizSession::start(quiz(4, None), fixed_now());
        for n in 1..=4 {
            session.select_answer(qid(n), 1).unwrap();
        }
        let score = *session.complete(fixed_now()).unwrap();
        assert_eq!(score.correct_answers, 4);
        assert_eq!(score.percentage, 100);
    }

    #[test]
    fn nothing_answered_scores_zero() {
        let mut session = QuizSession::start(quiz(4, None), fixed_now());
        let score = *session.complete(fixed_now()).unwrap();
        assert_eq!(score.total_answered, 0);
        assert_eq!(score.percentage, 0);
        assert_eq!(score.total_questions, 4);
    }

    #[test]
    fn manual_submission_after_550_seconds() {
        let mut session = QuizSession::start(quiz(5, Some(600)), fixed_now());
        session.select_answer(qid(1), 1).unwrap();
        session.select_answer(qid(2), 1).unwrap();
        session.select_answer(qid(3), 1).unwrap();
        session.select_answer(qid(4), 0).unwrap();
        for _ in 0..550 {
            session.tick();
        }
        assert_eq!(session.remaining_secs(), Some(50));

        let score = *session
            .complete(fixed_now() + Duration::seconds(550))
            .unwrap();
        assert_eq!(
            score,
            Score {
                correct_answers: 3,
                total_answered: 4,
                total_questions: 5,
                percentage: 60,
                time_spent_secs: 550,
                completion: Completion::Submitted,
            }
        );
        assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn countdown_expires_and_scores_recorded_answers() {
        let mut session = QuizSession::start(quiz(5, Some(3)), fixed_now());
        session.select_answer(qid(1), 1).unwrap();
        session.select_answer(qid(2), 2).unwrap();

        assert_eq!(session.tick(), TickOutcome::Running { remaining_secs: 2 });
        assert_eq!(session.tick(), TickOutcome::Running { remaining_secs: 1 });
        assert_eq!(session.tick(), TickOutcome::Expired);

        assert_eq!(session.status(), SessionStatus::Expired);
        assert_eq!(session.remaining_secs(), Some(0));
        let score = session.score().copied().unwrap();
        assert_eq!(score.correct_answers, 1);
        assert_eq!(score.total_answered, 2);
        assert_eq!(score.percentage, 20);
        assert_eq!(score.time_spent_secs, 3);
        assert_eq!(score.completion, Completion::TimedOut);

        assert_eq!(session.tick(), TickOutcome::Inactive);
        assert_eq!(session.remaining_secs(), Some(0));
    }

    #[test]
    fn expired_session_cannot_be_completed_again() {
        let mut session = QuizSession::start(quiz(1, Some(1)), fixed_now());
        assert_eq!(session.tick(), TickOutcome::Expired);
        let before = session.score().copied();

        let err = session.complete(fixed_now()).unwrap_err();
        assert_eq!(
            err,
            SessionError::NotActive {
                status: SessionStatus::Expired
            }
        );
        assert_eq!(session.status(), SessionStatus::Expired);
        assert_eq!(session.score().copied(), before);
    }

    #[test]
    fn untimed_session_measures_wall_clock() {
        let mut session = QuizSession::start(quiz(2, None), fixed_now());
        assert_eq!(session.tick(), TickOutcome::Untimed);
        assert_eq!(session.remaining_secs(), None);

        let score = session
            .complete(fixed_now() + Duration::seconds(42))
            .unwrap();
        assert_eq!(score.time_spent_secs, 42);
    }

    #[test]
    fn scoring_is_idempotent() {
        let mut session = QuizSession::start(quiz(3, Some(100)), fixed_now());
        session.select_answer(qid(1), 1).unwrap();
        session.select_answer(qid(3), 0).unwrap();
        session.tick();
        let first = *session.complete(fixed_now()).unwrap();

        let again = score_answers(
            session.quiz(),
            session.answers(),
            first.time_spent_secs,
            first.completion,
        );
        assert_eq!(first, again);
        assert_eq!(session.score(), Some(&first));
    }

    #[test]
    fn progress_reports_answered_share() {
        let mut session = QuizSession::start(quiz(4, None), fixed_now());
        session.select_answer(qid(2), 0).unwrap();
        session.toggle_flag(qid(4)).unwrap();
        session.go_to(3);

        let progress = session.progress();
        assert_eq!(
            progress,
            SessionProgress {
                total: 4,
                answered: 1,
                flagged: 1,
                current_index: 3,
                answered_percentage: 25,
            }
        );
    }

    #[test]
    fn review_only_after_finish() {
        let mut session = QuizSession::start(quiz(3, None), fixed_now());
        session.select_answer(qid(1), 1).unwrap();
        session.select_answer(qid(2), 3).unwrap();
        assert!(session.review().is_none());

        session.complete(fixed_now()).unwrap();
        let review = session.review().unwrap();
        assert_eq!(review.len(), 3);
        assert_eq!(review[0].question.id(), qid(1));
        assert_eq!((review[0].selected, review[0].correct), (Some(1), 1));
        assert!(review[0].is_correct);
        assert_eq!(review[1].selected, Some(3));
        assert!(!review[1].is_correct);
        assert_eq!(review[2].selected, None);
        assert!(!review[2].is_correct);
    }

    #[test]
    fn review_available_after_expiry() {
        let mut session = QuizSession::start(quiz(2, Some(1)), fixed_now());
        session.select_answer(qid(2), 1).unwrap();
        assert_eq!(session.tick(), TickOutcome::Expired);

        let correct: Vec<bool> = session
            .review()
            .unwrap()
            .iter()
            .map(|entry| entry.is_correct)
            .collect();
        assert_eq!(correct, vec![false, true]);
    }
}
