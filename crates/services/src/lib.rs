#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod http;
pub mod submitter;
pub mod timer;

pub use quiz_core::Clock;

pub use app_services::QuizServices;
pub use config::{EngineConfig, HttpBackendConfig};
pub use controller::{EngineEvent, SessionController, SessionSnapshot};
pub use error::{HistoryError, QuizServicesError, SessionError, SubmissionError};
pub use history::{HistoryLoader, QuizHistoryItem, RepositoryHistory, time_ago_label};
pub use http::HttpQuizBackend;
pub use submitter::{RepositorySubmitter, ResultSubmitter};
pub use timer::{CountdownTimer, GraceDelay};
