//! Client for the remote quiz backend (`/save-quiz`, `/get-quizzes`).

use async_trait::async_trait;
use quiz_core::model::{QuizSubmission, Score, UserId};
use reqwest::Client;
use serde::Deserialize;

use crate::config::HttpBackendConfig;
use crate::error::{HistoryError, SubmissionError};
use crate::history::{HistoryLoader, QuizHistoryItem};
use crate::submitter::ResultSubmitter;

#[derive(Clone)]
pub struct HttpQuizBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpQuizBackend {
    #[must_use]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url)
    }
}

#[async_trait]
impl ResultSubmitter for HttpQuizBackend {
    async fn submit(&self, submission: &QuizSubmission) -> Result<(), SubmissionError> {
        let response = self
            .client
            .get(self.endpoint("save-quiz"))
            .query(&save_query(submission))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(match rejection_message(&body) {
            Some(message) => SubmissionError::Rejected(message),
            None => SubmissionError::HttpStatus(status),
        })
    }
}

#[async_trait]
impl HistoryLoader for HttpQuizBackend {
    async fn list_recent(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizHistoryItem>, HistoryError> {
        let response = self
            .client
            .get(self.endpoint("get-quizzes"))
            .query(&[("email", user_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HistoryError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let mut items = decode_history(&body)?;
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(items)
    }
}

fn save_query(submission: &QuizSubmission) -> [(&'static str, String); 3] {
    [
        ("email", submission.user_id.as_str().to_string()),
        ("quiz_title", submission.quiz_title.clone()),
        ("score", submission.score.to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn rejection_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

#[derive(Debug, Deserialize)]
struct HistoryRow {
    title: String,
    score: String,
    #[serde(rename = "timeAgo")]
    time_ago: String,
}

fn decode_history(body: &str) -> Result<Vec<QuizHistoryItem>, HistoryError> {
    let rows: Vec<HistoryRow> =
        serde_json::from_str(body).map_err(|e| HistoryError::Decode(e.to_string()))?;
    rows.into_iter()
        .map(|row| {
            let score: Score = row
                .score
                .parse()
                .map_err(|e: quiz_core::model::ScoreError| HistoryError::Decode(e.to_string()))?;
            Ok(QuizHistoryItem {
                title: row.title,
                score,
                time_ago: row.time_ago,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{FinalScore, QuizId};
    use quiz_core::time::fixed_now;

    #[test]
    fn save_query_uses_score_label() {
        let submission = QuizSubmission::new(
            UserId::new("ada@example.com").unwrap(),
            FinalScore {
                quiz_id: QuizId::new(4),
                quiz_title: "SQL".into(),
                score: Score::new(3, 5).unwrap(),
            },
            fixed_now(),
        );
        let query = save_query(&submission);
        assert_eq!(query[0], ("email", "ada@example.com".to_string()));
        assert_eq!(query[1], ("quiz_title", "SQL".to_string()));
        assert_eq!(query[2], ("score", "3/5".to_string()));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let backend =
            HttpQuizBackend::new(HttpBackendConfig::new("http://localhost:5000/").unwrap());
        assert_eq!(
            backend.endpoint("get-quizzes"),
            "http://localhost:5000/get-quizzes"
        );
    }

    #[test]
    fn rejection_reads_message_field() {
        assert_eq!(
            rejection_message(r#"{"message": "Missing parameters"}"#).as_deref(),
            Some("Missing parameters")
        );
        assert_eq!(rejection_message("<html>oops</html>"), None);
        assert_eq!(rejection_message(r#"{"message": ""}"#), None);
    }

    #[test]
    fn history_decodes_backend_rows_and_ignores_styling() {
        let body = r#"[
            {"title": "Python", "score": "4/5", "timeAgo": "Today",
             "icon": "python", "bgColor": "bg-blue-100", "textColor": "text-blue-600"},
            {"title": "SQL", "score": "2/5", "timeAgo": "3 days ago"}
        ]"#;
        let items = decode_history(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Python");
        assert_eq!(items[0].score, Score::new(4, 5).unwrap());
        assert_eq!(items[1].time_ago, "3 days ago");
    }

    #[test]
    fn history_rejects_bad_score_labels() {
        let body = r#"[{"title": "SQL", "score": "lots", "timeAgo": "Today"}]"#;
        assert!(matches!(decode_history(body), Err(HistoryError::Decode(_))));
    }
}
