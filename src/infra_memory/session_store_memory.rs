use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Every this many issues the whole map is swept for expired records.
pub const SWEEP_INTERVAL: u64 = 256;

#[derive(Default)]
struct Sessions {
    by_token: HashMap<Token, SessionRecord>,
    by_login: HashMap<LoginId, HashSet<Token>>,
    issued: u64,
}

impl Sessions {
    fn remove(&mut self, token: &Token) -> Option<SessionRecord> {
        let record = self.by_token.remove(token)?;
        if let Some(tokens) = self.by_login.get_mut(&record.login_id) {
            tokens.remove(token);
            if tokens.is_empty() {
                self.by_login.remove(&record.login_id);
            }
        }
        Some(record)
    }

    fn drop_expired_of(&mut self, login_id: &LoginId, now: DateTime<Utc>) {
        let Some(tokens) = self.by_login.get(login_id) else {
            return;
        };
        let expired: Vec<Token> = tokens
            .iter()
            .filter(|token| {
                self.by_token
                    .get(*token)
                    .is_none_or(|record| record.is_expired(now))
            })
            .cloned()
            .collect();
        for token in expired {
            self.remove(&token);
            if let Some(tokens) = self.by_login.get_mut(login_id) {
                tokens.remove(&token);
                if tokens.is_empty() {
                    self.by_login.remove(login_id);
                }
            }
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let expired: Vec<Token> = self
            .by_token
            .values()
            .filter(|record| record.is_expired(now))
            .map(|record| record.token.clone())
            .collect();
        for token in expired {
            self.remove(&token);
        }
    }

    /// Live record for `token`; an expired one is dropped on the way.
    fn live(&mut self, token: &Token, now: DateTime<Utc>) -> Option<&mut SessionRecord> {
        let expired = self.by_token.get(token)?.is_expired(now);
        if expired {
            self.remove(token);
            return None;
        }
        self.by_token.get_mut(token)
    }
}

/// Single-process session store.
///
/// Everything lives in this process's memory: sessions do not survive a restart
/// and are not shared between service instances. Use the Redis or MySQL store
/// when more than one instance serves the same clients.
pub struct MemorySessionStore {
    clock: Arc<dyn Clock>,
    sessions: Mutex<Sessions>,
}

impl MemorySessionStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemorySessionStore {
            clock,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    /// Number of records held. Expired ones linger until their token is touched, their
    /// owner is issued a new session, or the next periodic sweep.
    pub fn len(&self) -> usize {
        self.sessions.lock().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn issue(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        sessions.issued += 1;
        if sessions.issued % SWEEP_INTERVAL == 0 {
            sessions.sweep(now);
        } else {
            sessions.drop_expired_of(&record.login_id, now);
        }
        // a reused token string replaces the previous owner's record
        sessions.remove(&record.token);
        sessions
            .by_login
            .entry(record.login_id.clone())
            .or_default()
            .insert(record.token.clone());
        sessions
            .by_token
            .insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, token: &Token) -> Result<SessionRecord, SessionStoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        sessions
            .live(token, now)
            .cloned()
            .ok_or(SessionStoreError::NotFound)
    }

    async fn refresh(
        &self,
        token: &Token,
        new_expire_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let record = sessions
            .live(token, now)
            .ok_or(SessionStoreError::NotFound)?;
        if new_expire_at > record.expire_at {
            record.expire_at = new_expire_at;
        }
        Ok(())
    }

    async fn revoke(&self, token: &Token) -> Result<(), SessionStoreError> {
        self.sessions.lock().remove(token);
        Ok(())
    }

    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, SessionStoreError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.lock();
        let Some(tokens) = sessions.by_login.remove(login_id) else {
            return Ok(0);
        };
        let mut removed = 0;
        for token in tokens {
            if let Some(record) = sessions.by_token.remove(&token) {
                if !record.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }
}
