#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod session;
pub mod time;

pub use error::Error;
pub use session::{
    AnswerRecord, AnswerStatus, Effect, QuizSession, SessionEvent, SessionState, Transition,
};
pub use time::Clock;
