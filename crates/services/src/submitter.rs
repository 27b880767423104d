use std::sync::Arc;

use async_trait::async_trait;
use quiz_core::model::QuizSubmission;
use storage::repository::QuizResultRepository;

use crate::error::SubmissionError;

/// Persists a finished quiz. Called at most once per session and never retried.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    /// # Errors
    ///
    /// Returns `SubmissionError` if the result could not be stored.
    async fn submit(&self, submission: &QuizSubmission) -> Result<(), SubmissionError>;
}

/// Appends results to the local results repository.
#[derive(Clone)]
pub struct RepositorySubmitter {
    results: Arc<dyn QuizResultRepository>,
}

impl RepositorySubmitter {
    #[must_use]
    pub fn new(results: Arc<dyn QuizResultRepository>) -> Self {
        Self { results }
    }
}

#[async_trait]
impl ResultSubmitter for RepositorySubmitter {
    async fn submit(&self, submission: &QuizSubmission) -> Result<(), SubmissionError> {
        let id = self.results.append_result(submission).await?;
        tracing::debug!(result_id = id, quiz_id = %submission.quiz_id, "result stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{FinalScore, QuizId, Score, UserId};
    use quiz_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn repository_submitter_appends_result() {
        let repo = InMemoryRepository::new();
        let submitter = RepositorySubmitter::new(Arc::new(repo.clone()));
        let user = UserId::new("ada@example.com").unwrap();
        let submission = QuizSubmission::new(
            user.clone(),
            FinalScore {
                quiz_id: QuizId::new(3),
                quiz_title: "Java".into(),
                score: Score::new(4, 5).unwrap(),
            },
            fixed_now(),
        );

        submitter.submit(&submission).await.unwrap();

        let stored = repo.list_recent(&user, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].quiz_title(), "Java");
        assert_eq!(stored[0].score().to_string(), "4/5");
    }
}
