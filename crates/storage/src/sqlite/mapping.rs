use quiz_core::model::{
    Difficulty, Question, QuestionId, QuizDefinition, QuizId, QuizResult, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn encode_options(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn decode_options(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_quiz_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizDefinition, StorageError> {
    let id = quiz_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let description: Option<String> = row.try_get("description").map_err(ser)?;
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let question_count = u32_from_i64(
        "question_count",
        row.try_get::<i64, _>("question_count").map_err(ser)?,
    )?;
    let limit = u32_from_i64(
        "per_question_time_limit_secs",
        row.try_get::<i64, _>("per_question_time_limit_secs")
            .map_err(ser)?,
    )?;
    let hint = row
        .try_get::<Option<i64>, _>("time_limit_hint_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_hint_secs", v))
        .transpose()?;

    let mut quiz =
        QuizDefinition::new(id, title, difficulty, question_count, limit).map_err(ser)?;
    if let Some(description) = description {
        quiz = quiz.with_description(description);
    }
    if let Some(hint) = hint {
        quiz = quiz.with_time_limit_hint(hint);
    }
    Ok(quiz)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let text: String = row.try_get("text").map_err(ser)?;
    let options = decode_options(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let correct: String = row.try_get("correct_answer").map_err(ser)?;
    let category: String = row.try_get("category").map_err(ser)?;

    Question::new(id, text, options, correct, category).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?;
    let quiz_id = quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?;
    let quiz_title: String = row.try_get("quiz_title").map_err(ser)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;

    QuizResult::from_persisted(id, user_id, quiz_id, quiz_title, correct, total, completed_at)
        .map_err(ser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_round_trip_through_json() {
        let options = vec!["push()".to_string(), "append(\"x\")".to_string()];
        let raw = encode_options(&options).unwrap();
        assert_eq!(decode_options(&raw).unwrap(), options);
    }

    #[test]
    fn rejects_negative_ids() {
        assert!(quiz_id_from_i64(-1).is_err());
        assert!(id_i64("quiz_id", u64::MAX).is_err());
    }
}
