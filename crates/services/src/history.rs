use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::Clock;
use quiz_core::model::{QuizResult, Score, UserId};
use serde::Serialize;
use storage::repository::QuizResultRepository;

use crate::error::HistoryError;

/// One row of the "recent quizzes" list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizHistoryItem {
    pub title: String,
    pub score: Score,
    pub time_ago: String,
}

/// Read-only access to a user's previous results, newest first.
#[async_trait]
pub trait HistoryLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns `HistoryError` if the history cannot be read.
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizHistoryItem>, HistoryError>;
}

/// Relative label used by the history list: "Today" or "N days ago".
#[must_use]
pub fn time_ago_label(days: i64) -> String {
    if days > 0 {
        format!("{days} days ago")
    } else {
        "Today".to_string()
    }
}

/// History read from the local results repository.
#[derive(Clone)]
pub struct RepositoryHistory {
    clock: Clock,
    results: Arc<dyn QuizResultRepository>,
}

impl RepositoryHistory {
    #[must_use]
    pub fn new(clock: Clock, results: Arc<dyn QuizResultRepository>) -> Self {
        Self { clock, results }
    }

    fn to_item(&self, result: &QuizResult) -> QuizHistoryItem {
        QuizHistoryItem {
            title: result.quiz_title().to_string(),
            score: result.score(),
            time_ago: time_ago_label(self.clock.days_since(result.completed_at())),
        }
    }
}

#[async_trait]
impl HistoryLoader for RepositoryHistory {
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizHistoryItem>, HistoryError> {
        let results = self.results.list_recent(user_id, limit).await?;
        Ok(results.iter().map(|r| self.to_item(r)).collect())
    }
}
