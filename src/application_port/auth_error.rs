use crate::domain_port::SessionStoreError;
use crate::idgen::IdError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("session store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid identifier format: {0}")]
    InvalidIdentifierFormat(String),
    #[error("timestamp {0} overflows the identifier's time field")]
    TimeOverflow(i64),
    #[error("clock moved backwards from {last_ms}ms to {now_ms}ms")]
    ClockRegression { last_ms: i64, now_ms: i64 },
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<SessionStoreError> for AuthError {
    fn from(error: SessionStoreError) -> Self {
        match error {
            SessionStoreError::NotFound => AuthError::Unauthenticated,
            SessionStoreError::Unavailable(e) => AuthError::StoreUnavailable(e),
        }
    }
}

impl From<IdError> for AuthError {
    fn from(error: IdError) -> Self {
        match error {
            IdError::InvalidFormat(e) => AuthError::InvalidIdentifierFormat(e),
            IdError::TimeOverflow(t) => AuthError::TimeOverflow(t),
            IdError::ClockRegression { last_ms, now_ms } => {
                AuthError::ClockRegression { last_ms, now_ms }
            }
            IdError::InvalidConfig(e) => AuthError::Config(e),
        }
    }
}
