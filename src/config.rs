use std::env;

use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_SESSION_DB: &str = "sqlite://learnhub-session.db";

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base address every API path is appended to, without a trailing slash.
    pub api_base_url: String,
    pub session_db_url: String,
}

impl AppConfig {
    pub fn new(api_base_url: impl Into<String>, session_db_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            session_db_url: session_db_url.into(),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let api_base_url =
            env::var("LEARNHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let session_db_url =
            env::var("LEARNHUB_SESSION_DB").unwrap_or_else(|_| DEFAULT_SESSION_DB.to_string());

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "LEARNHUB_API_URL must be an http(s) URL, got {}",
                api_base_url
            )));
        }

        Ok(Self::new(api_base_url, session_db_url))
    }

    pub fn with_overrides(mut self, api_url: Option<String>, session_db: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(db) = session_db {
            self.session_db_url = db;
        }
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }
}
