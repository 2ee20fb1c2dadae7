use crate::application_port::{AuthError, CredentialVerifier};
use crate::domain_model::LoginId;
use crate::logger::*;
use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use std::collections::HashMap;

/// Verifies secrets against Argon2 PHC strings loaded at startup, keyed by login id.
#[derive(Debug, Clone, Default)]
pub struct Argon2CredentialVerifier {
    hashes: HashMap<LoginId, String>,
}

impl Argon2CredentialVerifier {
    /// Fails on the first entry that is not a valid PHC string.
    pub fn from_settings(credentials: &HashMap<String, String>) -> Result<Self, AuthError> {
        let mut hashes = HashMap::with_capacity(credentials.len());
        for (login_id, hash) in credentials {
            PasswordHash::new(hash).map_err(|e| {
                AuthError::Config(format!("invalid PHC hash for {login_id:?}: {e}"))
            })?;
            hashes.insert(LoginId::from(login_id.as_str()), hash.clone());
        }
        Ok(Argon2CredentialVerifier { hashes })
    }

    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Config(e.to_string()))?
            .to_string();
        Ok(hash)
    }
}

#[async_trait::async_trait]
impl CredentialVerifier for Argon2CredentialVerifier {
    async fn verify(&self, login_id: &LoginId, secret: &str) -> Result<(), AuthError> {
        let Some(hash) = self.hashes.get(login_id) else {
            debug!(%login_id, "no credential on file");
            return Err(AuthError::Unauthenticated);
        };
        let parsed =
            PasswordHash::new(hash).map_err(|e| AuthError::Config(format!("invalid PHC hash: {e}")))?;

        match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => {
                debug!(%login_id, "credential mismatch");
                Err(AuthError::Unauthenticated)
            }
            Err(e) => Err(AuthError::Config(format!("verify error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};

    fn cheap_hash(password: &str) -> String {
        let argon2 = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(1024, 1, 1, None).unwrap(),
        );
        argon2
            .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn only_the_right_secret_passes() {
        let mut credentials = HashMap::new();
        credentials.insert("root".to_owned(), cheap_hash("correct horse"));
        let verifier = Argon2CredentialVerifier::from_settings(&credentials).unwrap();

        let root = LoginId::from("root");
        assert_eq!(verifier.verify(&root, "correct horse").await, Ok(()));
        assert_eq!(
            verifier.verify(&root, "battery staple").await,
            Err(AuthError::Unauthenticated)
        );
        assert_eq!(verifier.verify(&root, "").await, Err(AuthError::Unauthenticated));
        assert_eq!(
            verifier.verify(&LoginId::from("guest"), "").await,
            Err(AuthError::Unauthenticated)
        );
    }

    #[test]
    fn malformed_hash_is_a_config_error() {
        let mut credentials = HashMap::new();
        credentials.insert("root".to_owned(), "plaintext".to_owned());
        assert!(matches!(
            Argon2CredentialVerifier::from_settings(&credentials),
            Err(AuthError::Config(_))
        ));
    }
}
