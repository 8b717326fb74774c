use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("API error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Api { status: u16, message: Option<String> },

    #[error("Not enrolled in this course")]
    NotEnrolled,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error payload returned by the remote API.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl AppError {
    /// Classify a non-success, non-401 response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return AppError::Unauthorized;
        }
        if status == StatusCode::NOT_FOUND {
            return AppError::NotFound;
        }

        let parsed: ErrorResponse = serde_json::from_str(body).unwrap_or_default();
        AppError::Api {
            status: status.as_u16(),
            message: parsed.message.or(parsed.detail),
        }
    }

    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            AppError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound)
    }
}
