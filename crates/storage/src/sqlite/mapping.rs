use quiz_core::model::{
    ActorId, Author, Completion, Question, QuestionId, Quiz, QuizId, QuizOption, QuizResult,
    ResultId, Score,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn actor_id_from_i64(v: i64) -> Result<ActorId, StorageError> {
    Ok(ActorId::new(i64_to_u64("actor_id", v)?))
}

//
// ─── QUESTIONS JSON ────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize, Deserialize)]
struct StoredOption {
    label: String,
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredQuestion {
    id: u64,
    prompt: String,
    options: Vec<StoredOption>,
    correct: usize,
}

pub(crate) fn questions_to_json(questions: &[Question]) -> Result<String, StorageError> {
    let stored: Vec<StoredQuestion> = questions
        .iter()
        .map(|q| StoredQuestion {
            id: q.id().value(),
            prompt: q.prompt().to_owned(),
            options: q
                .options()
                .iter()
                .map(|o| StoredOption {
                    label: o.label().to_owned(),
                    text: o.text().to_owned(),
                })
                .collect(),
            correct: q.correct_index(),
        })
        .collect();
    serde_json::to_string(&stored).map_err(ser)
}

fn questions_from_json(json: &str) -> Result<Vec<Question>, StorageError> {
    let stored: Vec<StoredQuestion> = serde_json::from_str(json).map_err(ser)?;
    stored
        .into_iter()
        .map(|q| {
            let options = q
                .options
                .into_iter()
                .map(|o| QuizOption::new(o.label, o.text))
                .collect();
            Question::new(QuestionId::new(q.id), q.prompt, options, q.correct).map_err(ser)
        })
        .collect()
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<Quiz, StorageError> {
    let id = quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let time_limit_secs = row
        .try_get::<Option<i64>, _>("time_limit_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_secs", v))
        .transpose()?;

    let author_id = row
        .try_get::<Option<i64>, _>("author_id")
        .map_err(ser)?
        .map(actor_id_from_i64)
        .transpose()?;
    let author = row
        .try_get::<Option<String>, _>("author_name")
        .map_err(ser)?
        .map(|name| Author {
            id: author_id,
            name,
        });

    let questions_json: String = row.try_get("questions_json").map_err(ser)?;

    Quiz::new(
        id,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        time_limit_secs,
        questions_from_json(&questions_json)?,
        author,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let completion_str: String = row.try_get("completion").map_err(ser)?;
    let completion = Completion::parse(&completion_str).ok_or_else(|| {
        StorageError::Serialization(format!("invalid completion: {completion_str}"))
    })?;

    let percentage_i64: i64 = row.try_get("percentage").map_err(ser)?;
    let percentage = u8::try_from(percentage_i64)
        .ok()
        .filter(|p| *p <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid percentage: {percentage_i64}")))?;

    let score = Score {
        correct_answers: u32_from_i64(
            "correct_answers",
            row.try_get::<i64, _>("correct_answers").map_err(ser)?,
        )?,
        total_answered: u32_from_i64(
            "total_answered",
            row.try_get::<i64, _>("total_answered").map_err(ser)?,
        )?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        percentage,
        time_spent_secs: u32_from_i64(
            "time_spent_secs",
            row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
        )?,
        completion,
    };

    Ok(QuizResult {
        id: ResultId::new(i64_to_u64("id", row.try_get::<i64, _>("id").map_err(ser)?)?),
        quiz_id: quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        actor_id: row
            .try_get::<Option<i64>, _>("actor_id")
            .map_err(ser)?
            .map(actor_id_from_i64)
            .transpose()?,
        score,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
