use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session token handed to clients.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token(value.to_owned())
    }
}

/// Caller-defined account identifier. Integers are carried in their decimal form;
/// the authority never looks inside.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoginId(pub String);

impl LoginId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LoginId {
    fn from(value: String) -> Self {
        LoginId(value)
    }
}

impl From<&str> for LoginId {
    fn from(value: &str) -> Self {
        LoginId(value.to_owned())
    }
}

impl From<i64> for LoginId {
    fn from(value: i64) -> Self {
        LoginId(value.to_string())
    }
}

impl From<u64> for LoginId {
    fn from(value: u64) -> Self {
        LoginId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: Token,
    pub login_id: LoginId,
    pub expire_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(token: Token, login_id: LoginId, expire_at: DateTime<Utc>) -> Self {
        SessionRecord {
            token,
            login_id,
            expire_at,
        }
    }

    /// Time left before the record lapses; negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expire_at - now
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_login_ids_keep_decimal_form() {
        assert_eq!(LoginId::from(42_i64).as_str(), "42");
        assert_eq!(LoginId::from(7_u64), LoginId::from("7"));
    }

    #[test]
    fn record_expires_at_its_deadline() {
        let now = Utc::now();
        let record = SessionRecord::new(Token::from("t"), LoginId::from("u"), now);
        assert!(record.is_expired(now));
        assert!(!record.is_expired(now - Duration::milliseconds(1)));
        assert_eq!(record.remaining(now - Duration::seconds(5)), Duration::seconds(5));
    }
}
