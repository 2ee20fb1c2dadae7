//! Runs against a live Redis named by `TOKENWARD_TEST_REDIS_DSN`, e.g.
//! `TOKENWARD_TEST_REDIS_DSN=redis://127.0.0.1:6379 cargo test --test redis_store -- --ignored`
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokenward::domain_model::*;
use tokenward::domain_port::*;
use tokenward::infra_redis::RedisSessionStore;
use uuid::Uuid;

const DSN_VAR: &str = "TOKENWARD_TEST_REDIS_DSN";

/// A store under a fresh key prefix, or `None` when no Redis is configured.
async fn store() -> Option<RedisSessionStore> {
    let Ok(dsn) = std::env::var(DSN_VAR) else {
        eprintln!("{DSN_VAR} is not set, skipping");
        return None;
    };
    let client = redis::Client::open(dsn).unwrap();
    let conn = client.get_connection_manager().await.unwrap();
    let prefix = format!("tokenward-test:{}", Uuid::new_v4().simple());
    Some(RedisSessionStore::new(conn, prefix, Arc::new(SystemClock)))
}

fn record(token: &str, login_id: &str, ttl: Duration) -> SessionRecord {
    SessionRecord::new(
        Token::from(token),
        LoginId::from(login_id),
        Utc::now() + ttl,
    )
}

#[tokio::test]
#[ignore = "needs a redis server"]
async fn refresh_never_shortens_a_session() {
    let Some(store) = store().await else { return };
    let issued = record("t1", "alice", Duration::seconds(60));
    store.issue(&issued).await.unwrap();

    let fetched = store.fetch(&issued.token).await.unwrap();
    assert_eq!(fetched.login_id, issued.login_id);
    assert_eq!(
        fetched.expire_at.timestamp_millis(),
        issued.expire_at.timestamp_millis()
    );

    store
        .refresh(&issued.token, issued.expire_at - Duration::seconds(30))
        .await
        .unwrap();
    let fetched = store.fetch(&issued.token).await.unwrap();
    assert_eq!(
        fetched.expire_at.timestamp_millis(),
        issued.expire_at.timestamp_millis()
    );

    let later = issued.expire_at + Duration::seconds(60);
    store.refresh(&issued.token, later).await.unwrap();
    let fetched = store.fetch(&issued.token).await.unwrap();
    assert_eq!(fetched.expire_at.timestamp_millis(), later.timestamp_millis());

    assert!(matches!(
        store.refresh(&Token::from("missing"), later).await,
        Err(SessionStoreError::NotFound)
    ));
    store.revoke_all(&issued.login_id).await.unwrap();
}

#[tokio::test]
#[ignore = "needs a redis server"]
async fn revoke_all_counts_live_sessions_only() {
    let Some(store) = store().await else { return };
    store
        .issue(&record("short", "alice", Duration::milliseconds(200)))
        .await
        .unwrap();
    store
        .issue(&record("long", "alice", Duration::seconds(60)))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;

    assert!(matches!(
        store.fetch(&Token::from("short")).await,
        Err(SessionStoreError::NotFound)
    ));
    assert_eq!(store.revoke_all(&LoginId::from("alice")).await.unwrap(), 1);
    assert!(matches!(
        store.fetch(&Token::from("long")).await,
        Err(SessionStoreError::NotFound)
    ));
    assert_eq!(store.revoke_all(&LoginId::from("alice")).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "needs a redis server"]
async fn reissued_token_leaves_the_old_owners_index() {
    let Some(store) = store().await else { return };
    store
        .issue(&record("shared", "alice", Duration::seconds(60)))
        .await
        .unwrap();
    store
        .issue(&record("shared", "bob", Duration::seconds(60)))
        .await
        .unwrap();

    assert_eq!(store.revoke_all(&LoginId::from("alice")).await.unwrap(), 0);
    let fetched = store.fetch(&Token::from("shared")).await.unwrap();
    assert_eq!(fetched.login_id, LoginId::from("bob"));

    assert_eq!(store.revoke_all(&LoginId::from("bob")).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "needs a redis server"]
async fn revoke_drops_one_session() {
    let Some(store) = store().await else { return };
    store
        .issue(&record("a", "alice", Duration::seconds(60)))
        .await
        .unwrap();
    store
        .issue(&record("b", "alice", Duration::seconds(60)))
        .await
        .unwrap();

    store.revoke(&Token::from("a")).await.unwrap();
    store.revoke(&Token::from("a")).await.unwrap();
    assert!(matches!(
        store.fetch(&Token::from("a")).await,
        Err(SessionStoreError::NotFound)
    ));
    assert_eq!(store.revoke_all(&LoginId::from("alice")).await.unwrap(), 1);
}
