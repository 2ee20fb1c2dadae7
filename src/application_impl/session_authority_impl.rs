use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::idgen::{TokenGenerator, TokenStyle};
use crate::logger::*;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Upper bound on the session timeout: one hundred years.
pub const MAX_TIMEOUT_SECS: u64 = 100 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy)]
pub struct AuthorityConfig {
    pub timeout: Duration,
    pub token_style: TokenStyle,
}

impl AuthorityConfig {
    pub fn new(timeout_secs: u64, token_style: TokenStyle) -> Result<Self, AuthError> {
        if timeout_secs == 0 || timeout_secs > MAX_TIMEOUT_SECS {
            return Err(AuthError::Config(format!(
                "timeout must be within 1..={MAX_TIMEOUT_SECS}s, got {timeout_secs}s"
            )));
        }
        let timeout = i64::try_from(timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| AuthError::Config(format!("invalid timeout: {timeout_secs}s")))?;
        Ok(AuthorityConfig {
            timeout,
            token_style,
        })
    }
}

pub struct RealSessionAuthority {
    store: Arc<dyn SessionStore>,
    generator: Arc<TokenGenerator>,
    clock: Arc<dyn Clock>,
    config: AuthorityConfig,
}

impl RealSessionAuthority {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<TokenGenerator>,
        clock: Arc<dyn Clock>,
        config: AuthorityConfig,
    ) -> Self {
        RealSessionAuthority {
            store,
            generator,
            clock,
            config,
        }
    }

    /// Sessions with this much time left or less are extended on access, i.e. once
    /// 60% of the window has elapsed.
    fn refresh_threshold(&self) -> Duration {
        self.config.timeout * 2 / 5
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
        now.checked_add_signed(self.config.timeout)
            .ok_or(AuthError::TimeOverflow(now.timestamp_millis()))
    }

    async fn live_record(&self, token: &str) -> Result<SessionRecord, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::Unauthenticated);
        }
        let record = self.store.fetch(&Token::from(token)).await?;
        if record.is_expired(self.clock.now()) {
            return Err(AuthError::Unauthenticated);
        }
        Ok(record)
    }
}

#[async_trait::async_trait]
impl SessionAuthority for RealSessionAuthority {
    async fn issue(&self, login_id: &LoginId) -> Result<Token, AuthError> {
        let token = Token(self.generator.generate(self.config.token_style)?);
        let expire_at = self.expiry_from(self.clock.now())?;
        let record = SessionRecord::new(token, login_id.clone(), expire_at);

        self.store.issue(&record).await?;
        debug!(%login_id, %expire_at, "session issued");

        Ok(record.token)
    }

    async fn validate(&self, token: &str) -> Result<LoginId, AuthError> {
        let record = self.live_record(token).await?;

        let now = self.clock.now();
        if record.remaining(now) <= self.refresh_threshold() {
            let new_expire_at = self.expiry_from(now)?;
            match self.store.refresh(&record.token, new_expire_at).await {
                Ok(()) => debug!(login_id = %record.login_id, %new_expire_at, "session extended"),
                Err(e) => warn!(login_id = %record.login_id, error = %e, "session extension failed"),
            }
        }

        Ok(record.login_id)
    }

    async fn session(&self, token: &str) -> Result<SessionRecord, AuthError> {
        self.live_record(token).await
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        if token.trim().is_empty() {
            return Ok(());
        }
        self.store.revoke(&Token::from(token)).await?;
        debug!("session revoked");
        Ok(())
    }

    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, AuthError> {
        let removed = self.store.revoke_all(login_id).await?;
        info!(%login_id, removed, "sessions revoked");
        Ok(removed)
    }
}
