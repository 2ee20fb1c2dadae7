use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, TimeZone, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, FromRedisValue, RedisResult, RedisWrite, Script, ToRedisArgs, Value};
use std::sync::Arc;

const SESSION_ISSUE: &str = include_str!("session_issue.lua");
const SESSION_REFRESH: &str = include_str!("session_refresh.lua");
const SESSION_REVOKE: &str = include_str!("session_revoke.lua");
const SESSION_REVOKE_ALL: &str = include_str!("session_revoke_all.lua");

/// Session store on Redis.
///
/// Each session is a hash `{prefix}:token:{token}` with fields `login_id` and
/// `expire_at` (unix ms) and a matching `PEXPIREAT`, so Redis itself evicts dead
/// sessions. A set `{prefix}:login:{login_id}` indexes the tokens of one login id;
/// its TTL is kept at least as long as its longest-lived member. `revoke_all`
/// walks that set, so its cost grows with the number of tokens the login id was
/// issued since the set was last emptied, evicted ones included. Reissuing a live
/// token under another login id moves it between the two sets.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
    clock: Arc<dyn Clock>,
    issue_script: Script,
    refresh_script: Script,
    revoke_script: Script,
    revoke_all_script: Script,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
            clock,
            issue_script: Script::new(SESSION_ISSUE),
            refresh_script: Script::new(SESSION_REFRESH),
            revoke_script: Script::new(SESSION_REVOKE),
            revoke_all_script: Script::new(SESSION_REVOKE_ALL),
        }
    }

    fn token_key_prefix(&self) -> String {
        format!("{}:token:", self.prefix)
    }

    fn login_key_prefix(&self) -> String {
        format!("{}:login:", self.prefix)
    }

    fn token_key(&self, token: &Token) -> String {
        format!("{}{}", self.token_key_prefix(), token)
    }

    fn login_key(&self, login_id: &LoginId) -> String {
        format!("{}{}", self.login_key_prefix(), login_id)
    }

    fn ttl_millis(&self, expire_at: DateTime<Utc>) -> i64 {
        (expire_at - self.clock.now()).num_milliseconds().max(1)
    }
}

impl ToRedisArgs for Token {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.0.as_bytes())
    }
}

impl ToRedisArgs for LoginId {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        out.write_arg(self.0.as_bytes())
    }
}

impl FromRedisValue for LoginId {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let s: String = redis::from_redis_value(v)?;
        Ok(LoginId(s))
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn issue(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .issue_script
            .key(self.token_key(&record.token))
            .key(self.login_key(&record.login_id))
            .arg(&record.login_id)
            .arg(record.expire_at.timestamp_millis())
            .arg(self.ttl_millis(record.expire_at))
            .arg(&record.token)
            .arg(self.login_key_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(())
    }

    async fn fetch(&self, token: &Token) -> Result<SessionRecord, SessionStoreError> {
        let mut conn = self.conn.clone();
        let (login_id, expire_at): (Option<LoginId>, Option<i64>) = conn
            .hget(self.token_key(token), &["login_id", "expire_at"])
            .await
            .map_err(SessionStoreError::unavailable)?;

        let (Some(login_id), Some(expire_at)) = (login_id, expire_at) else {
            return Err(SessionStoreError::NotFound);
        };
        let expire_at = Utc
            .timestamp_millis_opt(expire_at)
            .single()
            .ok_or_else(|| SessionStoreError::Unavailable("corrupt expire_at".to_owned()))?;

        let record = SessionRecord::new(token.clone(), login_id, expire_at);
        // eviction lags the deadline by up to a few milliseconds
        if record.is_expired(self.clock.now()) {
            return Err(SessionStoreError::NotFound);
        }
        Ok(record)
    }

    async fn refresh(
        &self,
        token: &Token,
        new_expire_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let status: i64 = self
            .refresh_script
            .key(self.token_key(token))
            .arg(new_expire_at.timestamp_millis())
            .arg(self.ttl_millis(new_expire_at))
            .arg(self.login_key_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(SessionStoreError::unavailable)?;

        match status {
            0 => Err(SessionStoreError::NotFound),
            _ => Ok(()),
        }
    }

    async fn revoke(&self, token: &Token) -> Result<(), SessionStoreError> {
        let mut conn = self.conn.clone();
        let _: i64 = self
            .revoke_script
            .key(self.token_key(token))
            .arg(self.login_key_prefix())
            .arg(token)
            .invoke_async(&mut conn)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(())
    }

    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, SessionStoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = self
            .revoke_all_script
            .key(self.login_key(login_id))
            .arg(self.token_key_prefix())
            .invoke_async(&mut conn)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(removed)
    }
}
