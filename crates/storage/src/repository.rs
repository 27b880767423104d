use async_trait::async_trait;
use quiz_core::model::{
    Question, QuizDefinition, QuizError, QuizId, QuizResult, QuizResultId, QuizSubmission,
    UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid quiz: {0}")]
    InvalidQuiz(#[from] QuizError),
}

/// Read side of the quiz catalog.
///
/// Returned values are owned snapshots; later catalog writes never reach a
/// session that already holds them.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    /// Fetch a quiz definition by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz is unknown, or other storage errors.
    async fn lookup(&self, id: QuizId) -> Result<QuizDefinition, StorageError>;

    /// Ordered questions for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the quiz is unknown, or other storage errors.
    async fn questions_for(&self, id: QuizId) -> Result<Vec<Question>, StorageError>;

    /// All quizzes ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError>;
}

/// Write side of the quiz catalog, used by seeding.
#[async_trait]
pub trait QuizCatalogWriter: Send + Sync {
    /// Insert or replace a quiz and its full question list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuiz` if `questions` does not hold exactly
    /// `quiz.question_count()` entries, or other storage errors.
    async fn upsert_quiz(
        &self,
        quiz: &QuizDefinition,
        questions: &[Question],
    ) -> Result<(), StorageError>;
}

/// Completed quiz results per user.
#[async_trait]
pub trait QuizResultRepository: Send + Sync {
    /// Persist a completed quiz, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, submission: &QuizSubmission)
    -> Result<QuizResultId, StorageError>;

    /// Fetch a result by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError>;

    /// Most recent results for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<HashMap<QuizId, (QuizDefinition, Vec<Question>)>>>,
    results: Arc<Mutex<Vec<QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizCatalog for InMemoryRepository {
    async fn lookup(&self, id: QuizId) -> Result<QuizDefinition, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard
            .get(&id)
            .map(|(quiz, _)| quiz.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn questions_for(&self, id: QuizId) -> Result<Vec<Question>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard
            .get(&id)
            .map(|(_, questions)| questions.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        let mut quizzes: Vec<_> = guard.values().map(|(quiz, _)| quiz.clone()).collect();
        quizzes.sort_by_key(QuizDefinition::id);
        Ok(quizzes)
    }
}

#[async_trait]
impl QuizCatalogWriter for InMemoryRepository {
    async fn upsert_quiz(
        &self,
        quiz: &QuizDefinition,
        questions: &[Question],
    ) -> Result<(), StorageError> {
        quiz.check_question_count(questions.len())?;
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), (quiz.clone(), questions.to_vec()));
        Ok(())
    }
}

#[async_trait]
impl QuizResultRepository for InMemoryRepository {
    async fn append_result(
        &self,
        submission: &QuizSubmission,
    ) -> Result<QuizResultId, StorageError> {
        let mut guard = self.results.lock().map_err(poisoned)?;
        let id = QuizResultId::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("result id overflow".into()))?;
        guard.push(QuizResult::from_submission(id, submission));
        Ok(id)
    }

    async fn get_result(&self, id: QuizResultId) -> Result<QuizResult, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let guard = self.results.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .iter()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn QuizCatalog>,
    pub catalog_writer: Arc<dyn QuizCatalogWriter>,
    pub results: Arc<dyn QuizResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let catalog: Arc<dyn QuizCatalog> = Arc::new(repo.clone());
        let catalog_writer: Arc<dyn QuizCatalogWriter> = Arc::new(repo.clone());
        let results: Arc<dyn QuizResultRepository> = Arc::new(repo);
        Self {
            catalog,
            catalog_writer,
            results,
        }
    }
}
