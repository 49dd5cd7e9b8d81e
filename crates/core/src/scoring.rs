use std::collections::HashMap;

use crate::model::{Completion, QuestionId, Quiz, Score};

/// `round(part / whole * 100)`, rounding halves up. Zero when `whole` is zero.
#[must_use]
pub fn percent(part: u32, whole: u32) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = u64::from(part.min(whole));
    let whole = u64::from(whole);
    let rounded = (part * 200 + whole) / (whole * 2);
    u8::try_from(rounded).unwrap_or(100)
}

/// Scores recorded answers against a quiz.
///
/// Every recorded answer counts toward `total_answered`; only answers matching
/// the question's correct option count toward `correct_answers`. Answers for
/// questions not in the quiz are ignored.
#[must_use]
pub fn score_answers(
    quiz: &Quiz,
    answers: &HashMap<QuestionId, usize>,
    time_spent_secs: u32,
    completion: Completion,
) -> Score {
    let mut correct = 0_u32;
    let mut answered = 0_u32;

    for question in quiz.questions() {
        if let Some(&choice) = answers.get(&question.id()) {
            answered = answered.saturating_add(1);
            if question.is_correct(choice) {
                correct = correct.saturating_add(1);
            }
        }
    }

    let total = u32::try_from(quiz.question_count()).unwrap_or(u32::MAX);

    Score {
        correct_answers: correct,
        total_answered: answered,
        total_questions: total,
        percentage: percent(correct, total),
        time_spent_secs,
        completion,
    }
}
