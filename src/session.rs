//! Bearer credential held for the lifetime of the client.
//!
//! The token is persisted through a [`TokenStorage`] under a fixed key and
//! mirrored in a watch channel so that readers never touch storage on the
//! request path and views can subscribe to login/logout.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::AppError;

pub const TOKEN_KEY: &str = "token";

#[async_trait]
pub trait TokenStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
}

/// Key/value table in a local sqlite file.
pub struct SqliteStorage {
    db: SqlitePool,
}

impl SqliteStorage {
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // one connection, so `sqlite::memory:` stays a single database
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&db).await?;
        Ok(Self { db })
    }
}

#[async_trait]
impl TokenStorage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM storage WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO storage (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM storage WHERE key = ?1")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl TokenStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), AppError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct SessionManager {
    storage: Arc<dyn TokenStorage>,
    token: Arc<watch::Sender<Option<String>>>,
}

impl SessionManager {
    /// Restore whatever token was persisted by a previous run.
    pub async fn load(storage: Arc<dyn TokenStorage>) -> Result<Self, AppError> {
        let token = storage.get(TOKEN_KEY).await?;
        debug!(authenticated = token.is_some(), "session restored");
        let (tx, _rx) = watch::channel(token);
        Ok(Self {
            storage,
            token: Arc::new(tx),
        })
    }

    pub fn in_memory() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            storage: Arc::new(MemoryStorage::default()),
            token: Arc::new(tx),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    pub async fn set(&self, token: &str) -> Result<(), AppError> {
        self.storage.set(TOKEN_KEY, token).await?;
        self.token.send_replace(Some(token.to_string()));
        info!("session token stored");
        Ok(())
    }

    /// Drop the credential. Clearing an empty session is a no-op.
    pub async fn clear(&self) {
        if let Err(e) = self.storage.remove(TOKEN_KEY).await {
            warn!("failed to remove persisted token: {}", e);
        }
        let had_token = self.token.send_if_modified(|current| current.take().is_some());
        if had_token {
            info!("session token cleared");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_clear_notify_subscribers() {
        let session = SessionManager::in_memory();
        let mut rx = session.subscribe();

        session.set("abc").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_deref(), Some("abc"));
        assert!(session.is_authenticated());

        session.clear().await;
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn clearing_empty_session_does_not_notify() {
        let session = SessionManager::in_memory();
        let rx = session.subscribe();
        session.clear().await;
        session.clear().await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn sqlite_storage_persists_token_across_loads() {
        let storage: Arc<dyn TokenStorage> =
            Arc::new(SqliteStorage::connect("sqlite::memory:").await.unwrap());

        let session = SessionManager::load(storage.clone()).await.unwrap();
        assert!(session.token().is_none());
        session.set("persisted").await.unwrap();

        let restored = SessionManager::load(storage.clone()).await.unwrap();
        assert_eq!(restored.token().as_deref(), Some("persisted"));

        restored.clear().await;
        assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
    }
}
