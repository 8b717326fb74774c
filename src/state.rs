use std::sync::Arc;

use crate::api::{HttpApiClient, LearningApi};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::routing::{Navigator, Route};
use crate::session::{SessionManager, SqliteStorage, TokenStorage};
use crate::views::{ConsoleNotifier, Notifier};

#[derive(Clone)]
pub struct AppState {
    pub session: SessionManager,
    pub navigator: Navigator,
    pub api: Arc<dyn LearningApi>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Open the persisted session and build the HTTP client around it.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, AppError> {
        let storage: Arc<dyn TokenStorage> =
            Arc::new(SqliteStorage::connect(&config.session_db_url).await?);
        let session = SessionManager::load(storage).await?;
        let navigator = Navigator::new(Route::Home);
        let api = HttpApiClient::new(config, session.clone(), navigator.clone())?;

        Ok(Self {
            session,
            navigator,
            api: Arc::new(api),
            notifier: Arc::new(ConsoleNotifier),
        })
    }
}
