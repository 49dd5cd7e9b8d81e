use quiz_core::model::{Quiz, QuizId, ValidatedQuiz};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_quiz_row, questions_to_json, quiz_id_from_i64};
use crate::repository::{QuizRepository, StorageError};

#[async_trait::async_trait]
impl QuizRepository for SqliteRepository {
    async fn insert_new_quiz(&self, quiz: ValidatedQuiz) -> Result<Quiz, StorageError> {
        let questions_json = questions_to_json(quiz.questions())?;
        let author_id = quiz
            .author()
            .and_then(|a| a.id)
            .map(|id| id_i64("author_id", id.value()))
            .transpose()?;

        let res = sqlx::query(
            r"
                INSERT INTO quizzes (
                    title, description, time_limit_secs, author_id, author_name,
                    created_at, questions_json
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(quiz.time_limit_secs().map(i64::from))
        .bind(author_id)
        .bind(quiz.author().map(|a| a.name.as_str()))
        .bind(quiz.created_at())
        .bind(questions_json)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = quiz_id_from_i64(res.last_insert_rowid())?;
        Ok(quiz.assign_id(id))
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Option<Quiz>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, title, description, time_limit_secs, author_id, author_name,
                    created_at, questions_json
                FROM quizzes
                WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_quiz_row).transpose()
    }

    async fn list_quizzes(&self, limit: u32) -> Result<Vec<Quiz>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, title, description, time_limit_secs, author_id, author_name,
                    created_at, questions_json
                FROM quizzes
                ORDER BY id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_quiz_row(&row)?);
        }
        Ok(out)
    }
}
