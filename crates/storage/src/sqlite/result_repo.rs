use quiz_core::model::{QuizResult, QuizResultId, QuizSubmission, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_i64, map_result_row};
use crate::repository::{QuizResultRepository, StorageError};

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<QuizResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_results (
                    user_id, quiz_id, quiz_title, correct, total, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(submission.user_id.as_str())
        .bind(id_i64("quiz_id", submission.quiz_id.value())?)
        .bind(submission.quiz_title.as_str())
        .bind(i64::from(submission.score.correct()))
        .bind(i64::from(submission.score.total()))
        .bind(submission.completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(res.last_insert_rowid())
    }

    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, user_id, quiz_id, quiz_title, correct, total, completed_at
                FROM quiz_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, quiz_id, quiz_title, correct, total, completed_at
                FROM quiz_results
                WHERE user_id = ?1
                ORDER BY completed_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_result_row).collect()
    }
}
