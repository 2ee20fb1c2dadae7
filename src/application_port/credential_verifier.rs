use super::AuthError;
use crate::domain_model::LoginId;

/// Checks a login id's secret before a session is issued for it.
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// `Err(AuthError::Unauthenticated)` for an unknown login id or a wrong secret.
    async fn verify(&self, login_id: &LoginId, secret: &str) -> Result<(), AuthError>;
}
