use std::sync::Arc;

use quiz_core::model::{QuizDefinition, UserId};
use storage::catalog::{builtin_catalog, ensure_catalog};
use storage::repository::{QuizCatalog, Storage, StorageError};

use crate::config::{EngineConfig, HttpBackendConfig};
use crate::controller::SessionController;
use crate::error::{HistoryError, QuizServicesError};
use crate::history::{HistoryLoader, QuizHistoryItem, RepositoryHistory};
use crate::http::HttpQuizBackend;
use crate::submitter::{RepositorySubmitter, ResultSubmitter};
use crate::Clock;

/// Assembles the catalog, result persistence and history for the front end.
#[derive(Clone)]
pub struct QuizServices {
    clock: Clock,
    config: EngineConfig,
    catalog: Arc<dyn QuizCatalog>,
    submitter: Arc<dyn ResultSubmitter>,
    history: Arc<dyn HistoryLoader>,
    remote: bool,
}

impl QuizServices {
    /// Build services backed by `SQLite`, seeding the built-in catalog on first use.
    ///
    /// Results go to the remote backend when `http` is set, otherwise to the
    /// local database.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: EngineConfig,
        http: Option<HttpBackendConfig>,
    ) -> Result<Self, QuizServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::seeded(storage, clock, config, http).await
    }

    /// In-memory storage seeded with the built-in catalog.
    ///
    /// # Errors
    ///
    /// Returns `QuizServicesError` if the built-in catalog cannot be loaded.
    pub async fn in_memory(clock: Clock, config: EngineConfig) -> Result<Self, QuizServicesError> {
        Self::seeded(Storage::in_memory(), clock, config, None).await
    }

    async fn seeded(
        storage: Storage,
        clock: Clock,
        config: EngineConfig,
        http: Option<HttpBackendConfig>,
    ) -> Result<Self, QuizServicesError> {
        let entries = builtin_catalog()?;
        let inserted = ensure_catalog(
            storage.catalog.as_ref(),
            storage.catalog_writer.as_ref(),
            &entries,
        )
        .await?;
        if inserted > 0 {
            tracing::info!(inserted, "seeded built-in quiz catalog");
        }
        Ok(Self::from_storage(&storage, clock, config, http))
    }

    /// Wire services over existing storage without touching the catalog.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        config: EngineConfig,
        http: Option<HttpBackendConfig>,
    ) -> Self {
        let remote = http.is_some();
        let submitter: Arc<dyn ResultSubmitter>;
        let history: Arc<dyn HistoryLoader>;
        if let Some(http) = http {
            tracing::info!(base_url = %http.base_url, "using remote quiz backend");
            let backend = Arc::new(HttpQuizBackend::new(http));
            submitter = backend.clone();
            history = backend;
        } else {
            submitter = Arc::new(RepositorySubmitter::new(Arc::clone(&storage.results)));
            history = Arc::new(RepositoryHistory::new(clock, Arc::clone(&storage.results)));
        }

        Self {
            clock,
            config,
            catalog: Arc::clone(&storage.catalog),
            submitter,
            history,
            remote,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn uses_remote_backend(&self) -> bool {
        self.remote
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<dyn QuizCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn history(&self) -> Arc<dyn HistoryLoader> {
        Arc::clone(&self.history)
    }

    /// All quizzes in the catalog, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    pub async fn list_quizzes(&self) -> Result<Vec<QuizDefinition>, StorageError> {
        self.catalog.list_quizzes().await
    }

    /// The user's most recent results, limited by `EngineConfig::history_limit`.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError` if the history cannot be loaded.
    pub async fn recent_history(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<QuizHistoryItem>, HistoryError> {
        self.history
            .list_recent(user_id, self.config.history_limit)
            .await
    }

    /// A fresh controller for `user_id`.
    #[must_use]
    pub fn controller(&self, user_id: UserId) -> SessionController {
        SessionController::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.submitter),
            user_id,
            self.clock,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_ship_the_builtin_catalog() {
        let services = QuizServices::in_memory(fixed_clock(), EngineConfig::default())
            .await
            .unwrap();
        let titles: Vec<_> = services
            .list_quizzes()
            .await
            .unwrap()
            .iter()
            .map(|q| q.title().to_string())
            .collect();
        assert_eq!(
            titles,
            vec![
                "JavaScript",
                "Python",
                "Java",
                "SQL",
                "HTML/CSS",
                "Node.js",
                "C++",
                "TypeScript",
                "React"
            ]
        );
        assert!(!services.uses_remote_backend());
    }

    #[test]
    fn http_config_selects_remote_backend() {
        let services = QuizServices::from_storage(
            &Storage::in_memory(),
            fixed_clock(),
            EngineConfig::default(),
            HttpBackendConfig::new("http://localhost:5000"),
        );
        assert!(services.uses_remote_backend());
    }
}
