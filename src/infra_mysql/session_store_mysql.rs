use super::util::{is_dup_key, is_valid_table_name};
use crate::domain_model::*;
use crate::domain_port::*;
use anyhow::anyhow;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use std::sync::Arc;

struct SessionSql {
    create_table: String,
    insert: String,
    select: String,
    refresh: String,
    delete: String,
    delete_by_login: String,
    purge: String,
}

impl SessionSql {
    fn new(table: &str) -> Self {
        SessionSql {
            create_table: format!(
                r#"
CREATE TABLE IF NOT EXISTS {table} (
    token_str VARCHAR(191) NOT NULL PRIMARY KEY,
    login_id VARCHAR(191) NOT NULL,
    token_expire_time DATETIME(3) NOT NULL,
    KEY idx_login_id (login_id)
)
"#
            ),
            insert: format!(
                r#"
INSERT INTO {table} (token_str, login_id, token_expire_time)
VALUES (?, ?, ?)
"#
            ),
            select: format!(
                r#"
SELECT login_id, token_expire_time
FROM {table}
WHERE token_str = ? AND token_expire_time > ?
"#
            ),
            refresh: format!(
                r#"
UPDATE {table}
SET token_expire_time = GREATEST(token_expire_time, ?)
WHERE token_str = ? AND token_expire_time > ?
"#
            ),
            delete: format!("DELETE FROM {table} WHERE token_str = ?"),
            delete_by_login: format!("DELETE FROM {table} WHERE login_id = ?"),
            purge: format!("DELETE FROM {table} WHERE token_expire_time <= ?"),
        }
    }
}

/// DATETIME(3) keeps milliseconds; anything finer would be rounded by MySQL.
fn to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .unwrap_or(at)
}

/// Session store on a MySQL table `(token_str, login_id, token_expire_time)`.
///
/// Nothing sweeps the table in the background: every read compares
/// `token_expire_time` against the current time, so a dead row is invisible even
/// while it physically remains. [`MySqlSessionStore::purge_expired`] deletes such
/// rows on demand. `revoke_all` removes every row of the login id, dead rows
/// included, and reports them all.
pub struct MySqlSessionStore {
    pool: MySqlPool,
    clock: Arc<dyn Clock>,
    sql: SessionSql,
}

impl MySqlSessionStore {
    pub fn new(pool: MySqlPool, table_name: &str, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        if !is_valid_table_name(table_name) {
            return Err(anyhow!("invalid session table name: {table_name:?}"));
        }
        Ok(MySqlSessionStore {
            pool,
            clock,
            sql: SessionSql::new(table_name),
        })
    }

    pub async fn ensure_schema(&self) -> Result<(), SessionStoreError> {
        sqlx::query(&self.sql.create_table)
            .execute(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, SessionStoreError> {
        let result = sqlx::query(&self.sql.purge)
            .bind(to_millis(self.clock.now()))
            .execute(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(result.rows_affected())
    }

    fn row_to_record(token: &Token, row: MySqlRow) -> Result<SessionRecord, SessionStoreError> {
        let login_id: String = row
            .try_get("login_id")
            .map_err(SessionStoreError::unavailable)?;
        let expire_at: DateTime<Utc> = row
            .try_get("token_expire_time")
            .map_err(SessionStoreError::unavailable)?;

        Ok(SessionRecord::new(
            token.clone(),
            LoginId(login_id),
            expire_at,
        ))
    }
}

#[async_trait::async_trait]
impl SessionStore for MySqlSessionStore {
    async fn issue(&self, record: &SessionRecord) -> Result<(), SessionStoreError> {
        sqlx::query(&self.sql.insert)
            .bind(record.token.as_str())
            .bind(record.login_id.as_str())
            .bind(to_millis(record.expire_at))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_dup_key(&e) {
                    SessionStoreError::Unavailable(format!("token collision: {e}"))
                } else {
                    SessionStoreError::unavailable(e)
                }
            })?;
        Ok(())
    }

    async fn fetch(&self, token: &Token) -> Result<SessionRecord, SessionStoreError> {
        let row_opt: Option<MySqlRow> = sqlx::query(&self.sql.select)
            .bind(token.as_str())
            .bind(to_millis(self.clock.now()))
            .fetch_optional(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;

        match row_opt {
            Some(row) => Self::row_to_record(token, row),
            None => Err(SessionStoreError::NotFound),
        }
    }

    async fn refresh(
        &self,
        token: &Token,
        new_expire_at: DateTime<Utc>,
    ) -> Result<(), SessionStoreError> {
        let result = sqlx::query(&self.sql.refresh)
            .bind(to_millis(new_expire_at))
            .bind(token.as_str())
            .bind(to_millis(self.clock.now()))
            .execute(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        // zero rows also means "matched but unchanged" when the stored expiry is
        // already later; tell that apart from a missing session
        self.fetch(token).await.map(|_| ())
    }

    async fn revoke(&self, token: &Token) -> Result<(), SessionStoreError> {
        sqlx::query(&self.sql.delete)
            .bind(token.as_str())
            .execute(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(())
    }

    async fn revoke_all(&self, login_id: &LoginId) -> Result<u64, SessionStoreError> {
        let result = sqlx::query(&self.sql.delete_by_login)
            .bind(login_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(SessionStoreError::unavailable)?;
        Ok(result.rows_affected())
    }
}
