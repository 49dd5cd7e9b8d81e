use quiz_core::model::{QuizResult, ResultDraft, ResultId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_result_row};
use crate::repository::{ResultFilter, ResultRepository, StorageError};

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, draft: ResultDraft) -> Result<QuizResult, StorageError> {
        let quiz_id = id_i64("quiz_id", draft.quiz_id.value())?;
        let actor_id = draft
            .actor_id
            .map(|id| id_i64("actor_id", id.value()))
            .transpose()?;

        let quiz_exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = ?1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .is_some();
        if !quiz_exists {
            return Err(StorageError::NotFound);
        }

        let score = draft.score;
        let res = sqlx::query(
            r"
                INSERT INTO results (
                    quiz_id, actor_id, correct_answers, total_answered, total_questions,
                    percentage, time_spent_secs, completion, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
        )
        .bind(quiz_id)
        .bind(actor_id)
        .bind(i64::from(score.correct_answers))
        .bind(i64::from(score.total_answered))
        .bind(i64::from(score.total_questions))
        .bind(i64::from(score.percentage))
        .bind(i64::from(score.time_spent_secs))
        .bind(score.completion.as_str())
        .bind(draft.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("result id sign overflow".into()))?;
        Ok(draft.assign_id(ResultId::new(id)))
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, quiz_id, actor_id, correct_answers, total_answered, total_questions,
                    percentage, time_spent_secs, completion, completed_at
                FROM results
                WHERE id = ?1
            ",
        )
        .bind(id_i64("result_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_results(
        &self,
        filter: ResultFilter,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let (column, value) = match filter {
            ResultFilter::ByQuiz(id) => ("quiz_id", id_i64("quiz_id", id.value())?),
            ResultFilter::ByActor(id) => ("actor_id", id_i64("actor_id", id.value())?),
        };

        let sql = format!(
            r"
                SELECT
                    id, quiz_id, actor_id, correct_answers, total_answered, total_questions,
                    percentage, time_spent_secs, completion, completed_at
                FROM results
                WHERE {column} = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            "
        );

        let rows = sqlx::query(&sql)
            .bind(value)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
