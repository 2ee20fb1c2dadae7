use crate::domain_model::*;
use chrono::{DateTime, Utc};

/// Persistence for session records. Every implementation must treat a record whose
/// `expire_at` has passed as absent, whether or not it still exists physically.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a freshly issued record.
    async fn issue(&self, record: &SessionRecord) -> Result<(), SessionStoreError>;

    /// Look up a live record.
    async fn fetch(&self, token: &Token) -> Result<SessionRecord, SessionStoreError>;

    /// Move the expiry of a live record to `new_expire_at`. Expiry never moves backwards.
    async fn refresh(
        &self,
        token: &Token,
        new_expire_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError>;

    /// Remove a record. Removing an absent token succeeds.
    async fn revoke(&self, token: &Token) -> Result<(), SessionStoreError>;

    /// Remove every record owned by `login_id`, returning how many went away. Whether
    /// already-expired records are part of the count depends on the backend.
    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, SessionStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session not found or expired")]
    NotFound,
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

impl SessionStoreError {
    pub fn unavailable<E: std::fmt::Display>(error: E) -> Self {
        SessionStoreError::Unavailable(error.to_string())
    }
}
