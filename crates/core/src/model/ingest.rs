//! Translation from stored quiz records into the canonical model.
//!
//! Quiz records exist in two question shapes: options as plain strings with a
//! `correctAnswer` index, and options as objects carrying an `isCorrect` flag.
//! Both are accepted here and nowhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::actor::Author;
use crate::model::draft::ValidatedQuiz;
use crate::model::ids::QuestionId;
use crate::model::quiz::{Question, QuizError, QuizOption, option_label};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    #[error("quiz description is required")]
    MissingDescription,

    #[error("question {number} has no correct option")]
    NoCorrectOption { number: usize },

    #[error("question {number} marks {count} options as correct")]
    MultipleCorrectOptions { number: usize, count: usize },

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub questions: Vec<QuestionRecord>,
}

/// One question in either stored shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionRecord {
    Indexed(IndexedQuestionRecord),
    Flagged(FlaggedQuestionRecord),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedQuestionRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedQuestionRecord {
    pub question: String,
    pub options: Vec<FlaggedOptionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedOptionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl QuestionRecord {
    /// Converts to the canonical question with the given id.
    ///
    /// Blank option slots are dropped; the correct option must survive.
    ///
    /// # Errors
    ///
    /// Returns `IngestError` when the record does not designate exactly one
    /// non-blank correct option, or the resulting question is invalid.
    pub fn into_question(self, id: QuestionId, number: usize) -> Result<Question, IngestError> {
        let (prompt, slots) = match self {
            QuestionRecord::Indexed(q) => {
                let correct = q.correct_answer;
                let slots = q
                    .options
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| (None, text, i == correct))
                    .collect::<Vec<_>>();
                (q.question, slots)
            }
            QuestionRecord::Flagged(q) => {
                let count = q.options.iter().filter(|o| o.is_correct).count();
                if count > 1 {
                    return Err(IngestError::MultipleCorrectOptions { number, count });
                }
                let slots = q
                    .options
                    .into_iter()
                    .map(|o| (o.id, o.text, o.is_correct))
                    .collect::<Vec<_>>();
                (q.question, slots)
            }
        };

        let mut options = Vec::with_capacity(slots.len());
        let mut correct = None;
        for (label, text, is_correct) in slots {
            if text.trim().is_empty() {
                continue;
            }
            if is_correct {
                correct = Some(options.len());
            }
            let label = label
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| option_label(options.len()));
            options.push(QuizOption::new(label, text));
        }

        let correct = correct.ok_or(IngestError::NoCorrectOption { number })?;
        Ok(Question::new(id, prompt, options, correct)?)
    }
}

impl QuizRecord {
    /// Translate into a validated quiz ready for the repository.
    ///
    /// Question ids are assigned by position, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns `IngestError` for a blank title or description, an empty
    /// question list, a zero time limit, or any malformed question.
    pub fn into_validated(self, now: DateTime<Utc>) -> Result<ValidatedQuiz, IngestError> {
        if self.title.trim().is_empty() {
            return Err(QuizError::EmptyTitle.into());
        }
        if self.description.trim().is_empty() {
            return Err(IngestError::MissingDescription);
        }
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions.into());
        }
        if self.time_limit == Some(0) {
            return Err(QuizError::ZeroTimeLimit.into());
        }

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, record)| {
                let number = i + 1;
                let id = QuestionId::new(u64::try_from(number).unwrap_or(u64::MAX));
                record.into_question(id, number)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let author = self
            .created_by
            .filter(|name| !name.trim().is_empty())
            .map(Author::named);

        Ok(ValidatedQuiz::from_checked_parts(
            self.title,
            self.description,
            self.time_limit,
            questions,
            author,
            now,
        ))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::QuizId;
    use crate::time::fixed_now;

    const INDEXED: &str = r#"{
        "id": "1",
        "title": "JavaScript Basics",
        "description": "Test your knowledge of JavaScript fundamentals",
        "createdBy": "admin",
        "questions": [
            {
                "id": "2",
                "question": "Which of the following is NOT a JavaScript data type?",
                "options": ["String", "Boolean", "Integer", "Undefined"],
                "correctAnswer": 2
            }
        ]
    }"#;

    const FLAGGED: &str = r#"{
        "id": "health-quiz-001",
        "title": "Health & Wellness Quiz",
        "description": "Health and physical activities",
        "timeLimit": 600,
        "questions": [
            {
                "id": 2,
                "question": "How many hours of sleep do you get on average per night?",
                "type": "multiple-choice",
                "options": [
                    { "id": "a", "text": "Less than 6 hours", "isCorrect": false },
                    { "id": "b", "text": "6-7 hours", "isCorrect": false },
                    { "id": "c", "text": "7-9 hours", "isCorrect": true },
                    { "id": "d", "text": "More than 9 hours", "isCorrect": false }
                ]
            }
        ]
    }"#;

    #[test]
    fn indexed_shape_becomes_canonical() {
        let record: QuizRecord = serde_json::from_str(INDEXED).unwrap();
        assert!(matches!(record.questions[0], QuestionRecord::Indexed(_)));

        let quiz = record.into_validated(fixed_now()).unwrap().assign_id(QuizId::new(1));
        let q = &quiz.questions()[0];
        assert_eq!(q.id(), QuestionId::new(1));
        assert_eq!(q.correct_index(), 2);
        assert_eq!(q.correct_option().label(), "c");
        assert_eq!(quiz.time_limit_secs(), None);
        assert_eq!(quiz.author().map(|a| a.name.as_str()), Some("admin"));
    }

    #[test]
    fn flagged_shape_keeps_option_ids_as_labels() {
        let record: QuizRecord = serde_json::from_str(FLAGGED).unwrap();
        assert!(matches!(record.questions[0], QuestionRecord::Flagged(_)));

        let quiz = record.into_validated(fixed_now()).unwrap().assign_id(QuizId::new(2));
        let q = &quiz.questions()[0];
        assert_eq!(q.correct_index(), 2);
        assert_eq!(q.option_index("c"), Some(2));
        assert_eq!(quiz.time_limit_secs(), Some(600));
        assert!(quiz.author().is_none());
    }

    #[test]
    fn blank_slots_from_authoring_form_are_dropped() {
        let record = QuestionRecord::Indexed(IndexedQuestionRecord {
            question: "Pick".into(),
            options: vec!["".into(), "one".into(), "two".into(), " ".into()],
            correct_answer: 2,
        });
        let q = record.into_question(QuestionId::new(1), 1).unwrap();
        assert_eq!(q.options().len(), 2);
        assert_eq!(q.correct_index(), 1);
        assert_eq!(q.correct_option().label(), "b");
    }

    #[test]
    fn flagged_without_correct_option_rejected() {
        let record = QuestionRecord::Flagged(FlaggedQuestionRecord {
            question: "Pick".into(),
            options: vec![
                FlaggedOptionRecord { id: None, text: "x".into(), is_correct: false },
                FlaggedOptionRecord { id: None, text: "y".into(), is_correct: false },
            ],
        });
        let err = record.into_question(QuestionId::new(1), 4).unwrap_err();
        assert_eq!(err, IngestError::NoCorrectOption { number: 4 });
    }

    #[test]
    fn flagged_with_two_correct_options_rejected() {
        let record = QuestionRecord::Flagged(FlaggedQuestionRecord {
            question: "Pick".into(),
            options: vec![
                FlaggedOptionRecord { id: None, text: "x".into(), is_correct: true },
                FlaggedOptionRecord { id: None, text: "y".into(), is_correct: true },
            ],
        });
        let err = record.into_question(QuestionId::new(1), 1).unwrap_err();
        assert_eq!(err, IngestError::MultipleCorrectOptions { number: 1, count: 2 });
    }

    #[test]
    fn empty_question_list_rejected() {
        let record = QuizRecord {
            title: "Nothing".into(),
            description: "Empty on purpose".into(),
            time_limit: None,
            created_by: None,
            questions: Vec::new(),
        };
        let err = record.into_validated(fixed_now()).unwrap_err();
        assert_eq!(err, IngestError::Quiz(QuizError::NoQuestions));
    }

    #[test]
    fn blank_description_rejected_like_authoring() {
        let record: QuizRecord = serde_json::from_str(
            r#"{
                "title": "T",
                "description": "  ",
                "questions": [{ "question": "Q", "options": ["a", "b"], "correctAnswer": 0 }]
            }"#,
        )
        .unwrap();
        let err = record.into_validated(fixed_now()).unwrap_err();
        assert_eq!(err, IngestError::MissingDescription);

        let missing: QuizRecord = serde_json::from_str(
            r#"{ "title": "T", "questions": [{ "question": "Q", "options": ["a", "b"], "correctAnswer": 0 }] }"#,
        )
        .unwrap();
        assert_eq!(
            missing.into_validated(fixed_now()).unwrap_err(),
            IngestError::MissingDescription
        );
    }
}
