use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::idgen::TokenGenerator;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Settings, StoreType};
use anyhow::anyhow;
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;

/// Everything a request handler needs, wired from [`Settings`].
pub struct Server {
    pub authority: Arc<dyn SessionAuthority>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub guard: Arc<AuthGuard>,
    /// Header and cookie name carrying the token.
    pub token_name: String,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        Self::try_new_with_clock(settings, Arc::new(SystemClock)).await
    }

    pub async fn try_new_with_clock(
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let authority_settings = &settings.authority;
        let (store, pool) = Self::build_session_store(settings, clock.clone()).await?;

        let generator = Arc::new(TokenGenerator::new(
            authority_settings.snowflake.datacenter_id,
            authority_settings.snowflake.worker_id,
            clock.clone(),
        )?);
        let config = AuthorityConfig::new(
            authority_settings.timeout_secs,
            authority_settings.token_style,
        )?;
        let authority: Arc<dyn SessionAuthority> =
            Arc::new(RealSessionAuthority::new(store, generator, clock, config));

        let credentials: Arc<dyn CredentialVerifier> = Arc::new(
            Argon2CredentialVerifier::from_settings(&settings.credentials)?,
        );
        if settings.credentials.is_empty() {
            warn!("no credentials configured, no session can be issued over http");
        }

        let entitlements: Arc<dyn EntitlementSource> = Arc::new(
            StaticEntitlementSource::from_settings(&settings.entitlements),
        );
        let guard = Arc::new(AuthGuard::new(authority.clone(), entitlements));

        info!(
            store_type = ?authority_settings.store_type,
            token_style = ?authority_settings.token_style,
            timeout_secs = authority_settings.timeout_secs,
            "server started"
        );

        Ok(Self {
            authority,
            credentials,
            guard,
            token_name: authority_settings.token_name.clone(),
            pool,
        })
    }

    /// Picks the storage backend named by `authority.store_type`. The MySQL pool is
    /// handed back so that it can be closed on shutdown.
    pub async fn build_session_store(
        settings: &Settings,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<(Arc<dyn SessionStore>, Option<MySqlPool>)> {
        let authority = &settings.authority;
        match authority.store_type {
            StoreType::Memory => {
                info!("using in-memory session store");
                Ok((Arc::new(MemorySessionStore::new(clock)), None))
            }
            StoreType::Redis => {
                let redis = settings
                    .redis
                    .as_ref()
                    .ok_or_else(|| anyhow!("store_type is redis but [redis] is missing"))?;
                let redis_client = redis::Client::open(redis.dsn.as_str())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                info!(key_prefix = %authority.key_prefix, "using redis session store");
                Ok((
                    Arc::new(RedisSessionStore::new(
                        redis_manager,
                        authority.key_prefix.clone(),
                        clock,
                    )),
                    None,
                ))
            }
            StoreType::MySql => {
                let mysql = settings
                    .mysql
                    .as_ref()
                    .ok_or_else(|| anyhow!("store_type is mysql but [mysql] is missing"))?;
                let pool = MySqlPoolOptions::new()
                    .max_connections(mysql.max_connections)
                    .connect(&mysql.dsn)
                    .await?;

                let store = MySqlSessionStore::new(pool.clone(), &authority.table_name, clock)?;
                store.ensure_schema().await?;
                let purged = store.purge_expired().await?;
                info!(table = %authority.table_name, purged, "using mysql session store");

                Ok((Arc::new(store), Some(pool)))
            }
        }
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
