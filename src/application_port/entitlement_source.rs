use super::AuthError;
use crate::domain_model::LoginId;
use std::collections::HashSet;

/// Source of truth for what a login id is entitled to. The authority never caches
/// these sets.
#[async_trait::async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn permissions(&self, login_id: &LoginId) -> Result<HashSet<String>, AuthError>;
    async fn roles(&self, login_id: &LoginId) -> Result<HashSet<String>, AuthError>;
}
