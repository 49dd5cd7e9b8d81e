use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Completion, QuestionId, Quiz};
use quiz_core::session::SessionStatus;
use quiz_core::time::fixed_now;
use services::{AppServices, AttemptError, Clock, StaticIdentity};

async fn app() -> AppServices {
    AppServices::in_memory(Clock::fixed(fixed_now()), Arc::new(StaticIdentity::anonymous()))
        .await
        .expect("assemble services")
}

async fn health_quiz(app: &AppServices) -> Quiz {
    app.quiz_service()
        .search_quizzes("health", 1)
        .await
        .unwrap()
        .remove(0)
}

#[tokio::test(start_paused = true)]
async fn manual_submit_after_550_seconds() {
    let app = app().await;
    let quiz = health_quiz(&app).await;
    assert_eq!(quiz.time_limit_secs(), Some(600));

    let attempts = app.attempt_service();
    let mut attempt = attempts.start_attempt(quiz.id()).await.unwrap();
    attempt.select_answer(QuestionId::new(1), 0).unwrap();
    attempt.select_answer(QuestionId::new(2), 2).unwrap();
    attempt.select_answer(QuestionId::new(3), 1).unwrap();
    attempt.select_answer(QuestionId::new(4), 0).unwrap();

    tokio::time::sleep(Duration::from_millis(550_500)).await;
    assert_eq!(attempt.snapshot().unwrap().remaining_secs, Some(50));

    let result = attempts.submit(&mut attempt).await.unwrap();
    assert_eq!(result.score.correct_answers, 3);
    assert_eq!(result.score.total_questions, 5);
    assert_eq!(result.score.total_answered, 4);
    assert_eq!(result.score.percentage, 60);
    assert_eq!(result.score.time_spent_secs, 550);

    // The countdown is gone; nothing moves afterwards.
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(attempt.snapshot().unwrap().remaining_secs, Some(50));
}

#[tokio::test(start_paused = true)]
async fn countdown_expiry_is_finalized_once() {
    let app = app().await;
    let quiz = health_quiz(&app).await;
    let attempts = app.attempt_service();

    let mut attempt = attempts.start_attempt(quiz.id()).await.unwrap();
    attempt.select_answer(QuestionId::new(1), 0).unwrap();
    attempt.select_answer(QuestionId::new(2), 0).unwrap();

    assert!(attempt.wait_for_expiry().await);
    assert_eq!(attempt.status().unwrap(), SessionStatus::Expired);
    assert!(attempt.select_answer(QuestionId::new(3), 1).is_err());

    let err = attempts.submit(&mut attempt).await.unwrap_err();
    assert!(matches!(err, AttemptError::Session(_)));

    let result = attempts.finalize(&mut attempt).await.unwrap();
    assert_eq!(result.score.completion, Completion::TimedOut);
    assert_eq!(result.score.correct_answers, 1);
    assert_eq!(result.score.total_answered, 2);
    assert_eq!(result.score.percentage, 20);
    assert_eq!(result.score.time_spent_secs, 600);
    assert_eq!(result.actor_id, None);

    let again = attempts.finalize(&mut attempt).await.unwrap();
    assert_eq!(again, result);
    let stored = app
        .result_service()
        .results_for_quiz(quiz.id(), 10)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn fast_tick_period_expires_quickly() {
    let app = app().await.with_tick_period(Duration::from_millis(1));
    let quiz = app
        .quiz_service()
        .import_json(
            r#"{
                "title": "Lightning",
                "description": "Five seconds flat",
                "timeLimit": 5,
                "questions": [{ "question": "Q", "options": ["a", "b"], "correctAnswer": 0 }]
            }"#,
        )
        .await
        .unwrap()
        .remove(0);

    let attempts = app.attempt_service();
    let mut attempt = attempts.start_attempt(quiz.id()).await.unwrap();
    let expired = tokio::time::timeout(Duration::from_secs(5), attempt.wait_for_expiry())
        .await
        .expect("countdown finished in time");
    assert!(expired);

    let result = attempts.finalize(&mut attempt).await.unwrap();
    assert_eq!(result.score.percentage, 0);
    assert_eq!(result.score.time_spent_secs, 5);
}
