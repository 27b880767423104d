//! Built-in quiz catalog shipped with the binary.
//!
//! The content lives in `data/catalog.json`; each question's category is the
//! quiz title.

use quiz_core::model::{Difficulty, Question, QuestionId, QuizDefinition, QuizId};
use serde::Deserialize;
use thiserror::Error;

use crate::repository::{QuizCatalog, QuizCatalogWriter, StorageError};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogSeedError {
    #[error("invalid catalog data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] quiz_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Deserialize)]
struct QuizSeed {
    id: u64,
    title: String,
    description: Option<String>,
    difficulty: String,
    question_count: u32,
    per_question_time_limit_secs: u32,
    time_limit_hint_secs: Option<u32>,
    questions: Vec<QuestionSeed>,
}

#[derive(Debug, Deserialize)]
struct QuestionSeed {
    id: u64,
    text: String,
    options: Vec<String>,
    correct_answer: String,
}

/// A quiz together with its ordered questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub quiz: QuizDefinition,
    pub questions: Vec<Question>,
}

/// Parse a catalog document in the built-in JSON shape.
///
/// # Errors
///
/// Returns `CatalogSeedError::Parse` for malformed JSON and
/// `CatalogSeedError::Model` when a quiz or question fails validation,
/// including a question list whose length differs from `question_count`.
pub fn parse_catalog(raw: &str) -> Result<Vec<CatalogEntry>, CatalogSeedError> {
    let seeds: Vec<QuizSeed> = serde_json::from_str(raw)?;
    seeds.into_iter().map(build_entry).collect()
}

/// The catalog bundled with this crate.
///
/// # Errors
///
/// Returns `CatalogSeedError` if the bundled data is invalid.
pub fn builtin_catalog() -> Result<Vec<CatalogEntry>, CatalogSeedError> {
    parse_catalog(BUILTIN_CATALOG)
}

fn build_entry(seed: QuizSeed) -> Result<CatalogEntry, CatalogSeedError> {
    let difficulty: Difficulty = seed
        .difficulty
        .parse()
        .map_err(quiz_core::Error::from)?;
    let mut quiz = QuizDefinition::new(
        QuizId::new(seed.id),
        seed.title,
        difficulty,
        seed.question_count,
        seed.per_question_time_limit_secs,
    )
    .map_err(quiz_core::Error::from)?;
    if let Some(description) = seed.description {
        quiz = quiz.with_description(description);
    }
    if let Some(hint) = seed.time_limit_hint_secs {
        quiz = quiz.with_time_limit_hint(hint);
    }

    let questions = seed
        .questions
        .into_iter()
        .map(|q| {
            Question::new(
                QuestionId::new(q.id),
                q.text,
                q.options,
                q.correct_answer,
                quiz.title(),
            )
            .map_err(|e| CatalogSeedError::Model(e.into()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    quiz.check_question_count(questions.len())
        .map_err(quiz_core::Error::from)?;

    Ok(CatalogEntry { quiz, questions })
}

/// Write every entry that the catalog does not know yet. Returns how many
/// quizzes were inserted.
///
/// # Errors
///
/// Returns `CatalogSeedError::Storage` if reading or writing the catalog fails.
pub async fn ensure_catalog(
    catalog: &dyn QuizCatalog,
    writer: &dyn QuizCatalogWriter,
    entries: &[CatalogEntry],
) -> Result<usize, CatalogSeedError> {
    let mut inserted = 0;
    for entry in entries {
        match catalog.lookup(entry.quiz.id()).await {
            Ok(_) => continue,
            Err(StorageError::NotFound) => {
                writer.upsert_quiz(&entry.quiz, &entry.questions).await?;
                inserted += 1;
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(inserted)
}
