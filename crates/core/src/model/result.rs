use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuizId, QuizResultId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("score {correct} exceeds total {total}")]
    ExceedsTotal { correct: u32, total: u32 },

    #[error("invalid score label: {0}")]
    InvalidLabel(String),
}

//
// ─── SCORE ─────────────────────────────────────────────────────────────────────
//

/// Correct answers out of a total, rendered as `"correct/total"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    correct: u32,
    total: u32,
}

impl Score {
    /// # Errors
    ///
    /// Returns `ScoreError::ExceedsTotal` if `correct > total`.
    pub fn new(correct: u32, total: u32) -> Result<Self, ScoreError> {
        if correct > total {
            return Err(ScoreError::ExceedsTotal { correct, total });
        }
        Ok(Self { correct, total })
    }

    /// Builds a score, clamping `correct` to `total`.
    #[must_use]
    pub fn saturating(correct: u32, total: u32) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Percentage rounded down; an empty total counts as 0%.
    #[must_use]
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        self.correct * 100 / self.total
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.correct == self.total
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

impl FromStr for Score {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScoreError::InvalidLabel(s.to_string());
        let (correct, total) = s.trim().split_once('/').ok_or_else(invalid)?;
        let correct = correct.trim().parse::<u32>().map_err(|_| invalid())?;
        let total = total.trim().parse::<u32>().map_err(|_| invalid())?;
        Score::new(correct, total)
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// Outcome emitted by a session when it reaches `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalScore {
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub score: Score,
}

/// Payload handed to a result submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub score: Score,
    pub completed_at: DateTime<Utc>,
}

impl QuizSubmission {
    #[must_use]
    pub fn new(user_id: UserId, final_score: FinalScore, completed_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            quiz_id: final_score.quiz_id,
            quiz_title: final_score.quiz_title,
            score: final_score.score,
            completed_at,
        }
    }
}

/// Advisory persistence status of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    NotAttempted,
    Pending,
    Succeeded,
    Failed(String),
}

impl SubmissionStatus {
    /// True once the submission has either succeeded or failed.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, SubmissionStatus::Succeeded | SubmissionStatus::Failed(_))
    }
}

//
// ─── PERSISTED RESULT ──────────────────────────────────────────────────────────
//

/// A previously completed quiz as read back from history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    id: QuizResultId,
    user_id: UserId,
    quiz_id: QuizId,
    quiz_title: String,
    score: Score,
    completed_at: DateTime<Utc>,
}

impl QuizResult {
    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError::ExceedsTotal` if the stored counts are inconsistent.
    pub fn from_persisted(
        id: QuizResultId,
        user_id: UserId,
        quiz_id: QuizId,
        quiz_title: String,
        correct: u32,
        total: u32,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, ScoreError> {
        Ok(Self {
            id,
            user_id,
            quiz_id,
            quiz_title,
            score: Score::new(correct, total)?,
            completed_at,
        })
    }

    #[must_use]
    pub fn from_submission(id: QuizResultId, submission: &QuizSubmission) -> Self {
        Self {
            id,
            user_id: submission.user_id.clone(),
            quiz_id: submission.quiz_id,
            quiz_title: submission.quiz_title.clone(),
            score: submission.score,
            completed_at: submission.completed_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuizResultId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn quiz_title(&self) -> &str {
        &self.quiz_title
    }

    #[must_use]
    pub fn score(&self) -> Score {
        self.score
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn score_label_parses_backend_format() {
        let score: Score = "4/5".parse().unwrap();
        assert_eq!(score, Score::new(4, 5).unwrap());
        assert_eq!(score.to_string(), "4/5");
        assert_eq!(score.percent(), 80);
        assert!(!score.is_perfect());
    }

    #[test]
    fn score_rejects_bad_labels() {
        assert!("five".parse::<Score>().is_err());
        assert!("6/5".parse::<Score>().is_err());
        assert!("3-5".parse::<Score>().is_err());
    }

    #[test]
    fn saturating_score_clamps_to_total() {
        assert_eq!(Score::saturating(7, 5), Score::new(5, 5).unwrap());
    }

    #[test]
    fn empty_score_is_zero_percent() {
        assert_eq!(Score::new(0, 0).unwrap().percent(), 0);
    }

    #[test]
    fn result_copies_submission_fields() {
        let submission = QuizSubmission::new(
            UserId::new("ada@example.com").unwrap(),
            FinalScore {
                quiz_id: QuizId::new(2),
                quiz_title: "Python".into(),
                score: Score::new(3, 5).unwrap(),
            },
            fixed_now(),
        );
        let result = QuizResult::from_submission(9, &submission);
        assert_eq!(result.id(), 9);
        assert_eq!(result.quiz_title(), "Python");
        assert_eq!(result.score().to_string(), "3/5");
        assert_eq!(result.completed_at(), fixed_now());
    }

    #[test]
    fn submission_status_settles_only_on_terminal_values() {
        assert!(!SubmissionStatus::NotAttempted.is_settled());
        assert!(!SubmissionStatus::Pending.is_settled());
        assert!(SubmissionStatus::Succeeded.is_settled());
        assert!(SubmissionStatus::Failed("offline".into()).is_settled());
    }
}
