use quiz_core::model::{Question, QuizDefinition, QuizId};

use super::SqliteRepository;
use super::mapping::{conn, encode_options, id_i64, map_question_row, map_quiz_row};
use crate::repository::{QuizCatalog, QuizCatalogWriter, StorageError};

#[async_trait::async_trait]
impl QuizCatalog for SqliteRepository {
    async fn lookup(&self, id: QuizId) -> Result<QuizDefinition, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, title, description, difficulty, question_count,
                    per_question_time_limit_secs, time_limit_hint_secs
                FROM quizzes
                WHERE id = ?1
            ",
        )
        .bind(id_i64("quiz_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_quiz_row(&row)
    }

    async fn questions_for(&self, id: QuizId) -> Result<Vec<Question>, StorageError> {
        // Distinguish an unknown quiz from a quiz without questions.
        let quiz_id = id_i64("quiz_id", id.value())?;
        let exists = sqlx::query("SELECT 1 FROM quizzes WHERE id = ?1")
            .bind(quiz_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let rows = sqlx::query(
            r"
                SELECT id, text, options, correct_answer, category
                FROM questions
                WHERE quiz_id = ?1
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, title, description, difficulty, question_count,
                    per_question_time_limit_secs, time_limit_hint_secs
                FROM quizzes
                ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_quiz_row).collect()
    }
}

#[async_trait::async_trait]
impl QuizCatalogWriter for SqliteRepository {
    async fn upsert_quiz(
        &self,
        quiz: &QuizDefinition,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        quiz.check_question_count(questions.len())?;
        let quiz_id = id_i64("quiz_id", quiz.id().value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO quizzes (
                    id, title, description, difficulty, question_count,
                    per_question_time_limit_secs, time_limit_hint_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    difficulty = excluded.difficulty,
                    question_count = excluded.question_count,
                    per_question_time_limit_secs = excluded.per_question_time_limit_secs,
                    time_limit_hint_secs = excluded.time_limit_hint_secs
            ",
        )
        .bind(quiz_id)
        .bind(quiz.title())
        .bind(quiz.description())
        .bind(quiz.difficulty().as_str())
        .bind(i64::from(quiz.question_count()))
        .bind(i64::from(quiz.per_question_time_limit_secs()))
        .bind(quiz.time_limit_hint_secs().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM questions WHERE quiz_id = ?1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in questions.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                    INSERT INTO questions (
                        id, quiz_id, position, text, options, correct_answer, category
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(id_i64("question_id", question.id().value())?)
            .bind(quiz_id)
            .bind(position)
            .bind(question.text())
            .bind(encode_options(question.options())?)
            .bind(question.correct_answer())
            .bind(question.category())
            .execute(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
                other => conn(other),
            })?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
