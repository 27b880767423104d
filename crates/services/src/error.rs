//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::QuizId;
use storage::catalog::CatalogSeedError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors that abort `SessionController::start`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz {0} is not in the catalog")]
    CatalogNotFound(QuizId),
    #[error("quiz {0} has no questions")]
    NoQuestions(QuizId),
    #[error("quiz {quiz_id} declares {expected} questions but the catalog holds {found}")]
    QuestionCountMismatch {
        quiz_id: QuizId,
        expected: u32,
        found: usize,
    },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors reported by a `ResultSubmitter`. The session never rolls back on these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("quiz backend returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("quiz backend rejected the result: {0}")]
    Rejected(String),
}

/// Errors reported by a `HistoryLoader`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("quiz backend returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("invalid history payload: {0}")]
    Decode(String),
}

/// Errors emitted while bootstrapping quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Seed(#[from] CatalogSeedError),
}
