use super::AuthError;
use crate::domain_model::*;

/// Lifecycle of opaque session tokens.
///
/// A revoked or expired token is indistinguishable from one that was never issued.
#[async_trait::async_trait]
pub trait SessionAuthority: Send + Sync {
    /// Issue a new token for `login_id`. The token is only usable once this returns `Ok`.
    async fn issue(&self, login_id: &LoginId) -> Result<Token, AuthError>;

    /// Resolve a token to its owner, extending the session when most of its window
    /// has elapsed.
    async fn validate(&self, token: &str) -> Result<LoginId, AuthError>;

    /// Read a live session without extending it.
    async fn session(&self, token: &str) -> Result<SessionRecord, AuthError>;

    async fn revoke(&self, token: &str) -> Result<(), AuthError>;

    /// Revoke every session of `login_id`, returning how many were removed.
    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, AuthError>;
}
