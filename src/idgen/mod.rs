//! Token string producers.

mod error;
mod object_id;
mod snowflake;
mod ulid;

pub use error::*;
pub use object_id::*;
pub use snowflake::*;
pub use ulid::*;

use crate::domain_port::Clock;
use crate::logger::*;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NANOID_LEN: usize = 21;
pub const RANDOM128_LEN: usize = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TokenStyle {
    #[default]
    Uuid,
    Ulid,
    Snowflake,
    ObjectId,
    Random128,
    NanoId,
}

impl From<&str> for TokenStyle {
    /// Unknown names fall back to [`TokenStyle::Uuid`].
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "uuid" => TokenStyle::Uuid,
            "ulid" => TokenStyle::Ulid,
            "snowflake" => TokenStyle::Snowflake,
            "objectid" | "object_id" => TokenStyle::ObjectId,
            "random128" => TokenStyle::Random128,
            "nanoid" | "nano_id" => TokenStyle::NanoId,
            "" => TokenStyle::Uuid,
            other => {
                warn!(style = other, "unknown token style, using uuid");
                TokenStyle::Uuid
            }
        }
    }
}

impl From<String> for TokenStyle {
    fn from(value: String) -> Self {
        TokenStyle::from(value.as_str())
    }
}

impl From<TokenStyle> for String {
    fn from(value: TokenStyle) -> Self {
        match value {
            TokenStyle::Uuid => "uuid",
            TokenStyle::Ulid => "ulid",
            TokenStyle::Snowflake => "snowflake",
            TokenStyle::ObjectId => "objectid",
            TokenStyle::Random128 => "random128",
            TokenStyle::NanoId => "nanoid",
        }
        .to_owned()
    }
}

/// Owns the stateful generators so that sequence and monotonic state is shared by
/// every caller of one authority.
pub struct TokenGenerator {
    ulid: UlidGenerator,
    snowflake: Snowflake,
    object_id: ObjectIdGenerator,
}

impl TokenGenerator {
    pub fn new(
        datacenter_id: u64,
        worker_id: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IdError> {
        Ok(TokenGenerator {
            ulid: UlidGenerator::new(clock.clone()),
            snowflake: Snowflake::new(datacenter_id, worker_id, clock.clone())?,
            object_id: ObjectIdGenerator::new(clock),
        })
    }

    pub fn generate(&self, style: TokenStyle) -> Result<String, IdError> {
        let token = match style {
            TokenStyle::Uuid => uuid::Uuid::new_v4().simple().to_string(),
            TokenStyle::Ulid => self.ulid.next_ulid()?.to_lowercase_string(),
            TokenStyle::Snowflake => self.snowflake.next_id()?.to_string(),
            TokenStyle::ObjectId => self.object_id.next_id()?,
            TokenStyle::Random128 => rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(RANDOM128_LEN)
                .map(char::from)
                .collect(),
            TokenStyle::NanoId => nanoid::nanoid!(NANOID_LEN),
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::SystemClock;
    use std::collections::HashSet;

    fn generator() -> TokenGenerator {
        TokenGenerator::new(1, 1, Arc::new(SystemClock)).unwrap()
    }

    #[test]
    fn unknown_style_falls_back_to_uuid() {
        assert_eq!(TokenStyle::from("tiny"), TokenStyle::Uuid);
        assert_eq!(TokenStyle::from(""), TokenStyle::Uuid);
        assert_eq!(TokenStyle::from("ObjectId"), TokenStyle::ObjectId);
        assert_eq!(TokenStyle::from("NANOID"), TokenStyle::NanoId);
    }

    #[test]
    fn each_style_has_its_fixed_shape() {
        let generator = generator();

        let uuid = generator.generate(TokenStyle::Uuid).unwrap();
        assert_eq!(uuid.len(), 32);
        assert!(!uuid.contains('-'));

        let ulid = generator.generate(TokenStyle::Ulid).unwrap();
        assert_eq!(ulid.len(), ULID_CHARS);
        assert_eq!(ulid, ulid.to_lowercase());
        assert!(Ulid::decode(&ulid).is_ok());

        let snowflake = generator.generate(TokenStyle::Snowflake).unwrap();
        assert!(snowflake.parse::<u64>().is_ok());

        assert_eq!(generator.generate(TokenStyle::ObjectId).unwrap().len(), 24);
        assert_eq!(generator.generate(TokenStyle::NanoId).unwrap().len(), NANOID_LEN);

        let random = generator.generate(TokenStyle::Random128).unwrap();
        assert_eq!(random.len(), RANDOM128_LEN);
        assert!(random.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let generator = generator();
        for style in [
            TokenStyle::Uuid,
            TokenStyle::Ulid,
            TokenStyle::Snowflake,
            TokenStyle::ObjectId,
            TokenStyle::NanoId,
        ] {
            let tokens: HashSet<String> = (0..1_000)
                .map(|_| generator.generate(style).unwrap())
                .collect();
            assert_eq!(tokens.len(), 1_000, "{style:?}");
        }
    }
}
