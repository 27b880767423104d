use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuizId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("question count must be > 0")]
    InvalidQuestionCount,

    #[error("per-question time limit must be at least 1 second")]
    InvalidTimeLimit,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("quiz expects {expected} questions, found {found}")]
    QuestionCountMismatch { expected: u32, found: usize },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Stable lowercase form used by storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

impl FromStr for Difficulty {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuizError::UnknownDifficulty(s.to_string())),
        }
    }
}

//
// ─── DEFINITION ────────────────────────────────────────────────────────────────
//

/// Catalog entry describing one quiz.
///
/// `per_question_time_limit_secs` drives the countdown for every question;
/// `time_limit_hint_secs` is display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDefinition {
    id: QuizId,
    title: String,
    description: Option<String>,
    difficulty: Difficulty,
    question_count: u32,
    per_question_time_limit_secs: u32,
    time_limit_hint_secs: Option<u32>,
}

impl QuizDefinition {
    /// Creates a validated quiz definition.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyTitle` if the title is blank,
    /// `QuizError::InvalidQuestionCount` if `question_count` is zero and
    /// `QuizError::InvalidTimeLimit` if the per-question limit is zero.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        difficulty: Difficulty,
        question_count: u32,
        per_question_time_limit_secs: u32,
    ) -> Result<Self, QuizError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if question_count == 0 {
            return Err(QuizError::InvalidQuestionCount);
        }
        if per_question_time_limit_secs == 0 {
            return Err(QuizError::InvalidTimeLimit);
        }

        Ok(Self {
            id,
            title: title.to_string(),
            description: None,
            difficulty,
            question_count,
            per_question_time_limit_secs,
            time_limit_hint_secs: None,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    #[must_use]
    pub fn with_time_limit_hint(mut self, seconds: u32) -> Self {
        self.time_limit_hint_secs = (seconds > 0).then_some(seconds);
        self
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn per_question_time_limit_secs(&self) -> u32 {
        self.per_question_time_limit_secs
    }

    #[must_use]
    pub fn time_limit_hint_secs(&self) -> Option<u32> {
        self.time_limit_hint_secs
    }

    /// Checks that a question list has exactly `question_count` entries.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::QuestionCountMismatch` otherwise.
    pub fn check_question_count(&self, found: usize) -> Result<(), QuizError> {
        let expected = self.question_count;
        if usize::try_from(expected).ok() == Some(found) {
            return Ok(());
        }
        Err(QuizError::QuestionCountMismatch { expected, found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_count_must_match_exactly() {
        let quiz = QuizDefinition::new(QuizId::new(1), "SQL", Difficulty::Easy, 3, 30).unwrap();
        assert!(quiz.check_question_count(3).is_ok());
        assert_eq!(
            quiz.check_question_count(2).unwrap_err(),
            QuizError::QuestionCountMismatch {
                expected: 3,
                found: 2
            }
        );
        assert!(quiz.check_question_count(4).is_err());
    }

    #[test]
    fn rejects_invalid_definitions() {
        assert_eq!(
            QuizDefinition::new(QuizId::new(1), "  ", Difficulty::Easy, 5, 30).unwrap_err(),
            QuizError::EmptyTitle
        );
        assert_eq!(
            QuizDefinition::new(QuizId::new(1), "SQL", Difficulty::Easy, 0, 30).unwrap_err(),
            QuizError::InvalidQuestionCount
        );
        assert_eq!(
            QuizDefinition::new(QuizId::new(1), "SQL", Difficulty::Easy, 5, 0).unwrap_err(),
            QuizError::InvalidTimeLimit
        );
    }

    #[test]
    fn optional_fields_drop_blank_values() {
        let quiz = QuizDefinition::new(QuizId::new(4), " SQL ", Difficulty::Medium, 5, 30)
            .unwrap()
            .with_description("   ")
            .with_time_limit_hint(0);
        assert_eq!(quiz.title(), "SQL");
        assert_eq!(quiz.description(), None);
        assert_eq!(quiz.time_limit_hint_secs(), None);
    }

    #[test]
    fn difficulty_parses_storage_and_display_forms() {
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!("Medium".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Easy.as_str(), "easy");
        assert_eq!(Difficulty::Easy.to_string(), "Easy");
    }
}
