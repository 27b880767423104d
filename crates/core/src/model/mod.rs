mod ids;
mod question;
mod quiz;
mod result;

pub use ids::{ParseIdError, QuestionId, QuizId, QuizResultId, SessionId, UserId, UserIdError};

pub use question::{Question, QuestionError};
pub use quiz::{Difficulty, QuizDefinition, QuizError};
pub use result::{
    FinalScore, QuizResult, QuizSubmission, Score, ScoreError, SubmissionStatus,
};
