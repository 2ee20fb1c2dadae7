use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;
use tokenward::application_impl::*;
use tokenward::application_port::*;
use tokenward::domain_model::*;
use tokenward::domain_port::*;
use tokenward::idgen::{TokenGenerator, TokenStyle};
use tokenward::infra_memory::MemorySessionStore;

struct Fixture {
    clock: Arc<ManualClock>,
    authority: Arc<dyn SessionAuthority>,
}

fn fixture(timeout_secs: u64, style: TokenStyle) -> Fixture {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let authority = Arc::new(RealSessionAuthority::new(
        Arc::new(MemorySessionStore::new(clock.clone())),
        Arc::new(TokenGenerator::new(3, 7, clock.clone()).unwrap()),
        clock.clone(),
        AuthorityConfig::new(timeout_secs, style).unwrap(),
    ));
    Fixture { clock, authority }
}

#[tokio::test]
async fn validate_extends_only_late_in_the_window() {
    let Fixture { clock, authority } = fixture(100, TokenStyle::Uuid);
    let start = clock.now();
    let login_id = LoginId::from(42_i64);

    let token = authority.issue(&login_id).await.unwrap();
    assert_eq!(
        authority.session(token.as_str()).await.unwrap().expire_at,
        start + Duration::seconds(100)
    );

    clock.advance(Duration::seconds(59));
    assert_eq!(authority.validate(token.as_str()).await.unwrap(), login_id);
    assert_eq!(
        authority.session(token.as_str()).await.unwrap().expire_at,
        start + Duration::seconds(100)
    );

    clock.advance(Duration::seconds(2));
    assert_eq!(authority.validate(token.as_str()).await.unwrap(), login_id);
    assert_eq!(
        authority.session(token.as_str()).await.unwrap().expire_at,
        start + Duration::seconds(161)
    );
}

#[tokio::test]
async fn untouched_session_expires() {
    let Fixture { clock, authority } = fixture(100, TokenStyle::Ulid);
    let token = authority.issue(&LoginId::from("alice")).await.unwrap();

    clock.advance(Duration::seconds(100));
    assert_eq!(
        authority.validate(token.as_str()).await,
        Err(AuthError::Unauthenticated)
    );
}

#[tokio::test]
async fn session_peek_does_not_extend() {
    let Fixture { clock, authority } = fixture(100, TokenStyle::Snowflake);
    let token = authority.issue(&LoginId::from("alice")).await.unwrap();
    let issued = authority.session(token.as_str()).await.unwrap().expire_at;

    clock.advance(Duration::seconds(90));
    assert_eq!(
        authority.session(token.as_str()).await.unwrap().expire_at,
        issued
    );
}

#[tokio::test]
async fn revoked_token_no_longer_validates() {
    let Fixture { authority, .. } = fixture(1800, TokenStyle::ObjectId);
    let token = authority.issue(&LoginId::from("alice")).await.unwrap();

    authority.revoke(token.as_str()).await.unwrap();
    assert_eq!(
        authority.validate(token.as_str()).await,
        Err(AuthError::Unauthenticated)
    );
    authority.revoke(token.as_str()).await.unwrap();
}

#[tokio::test]
async fn revoke_all_leaves_other_logins_alone() {
    let Fixture { authority, .. } = fixture(1800, TokenStyle::NanoId);
    let alice = LoginId::from("alice");
    let bob = LoginId::from("bob");

    let alice_tokens = [
        authority.issue(&alice).await.unwrap(),
        authority.issue(&alice).await.unwrap(),
        authority.issue(&alice).await.unwrap(),
    ];
    let bob_token = authority.issue(&bob).await.unwrap();

    assert_eq!(authority.revoke_all(&alice).await.unwrap(), 3);
    for token in &alice_tokens {
        assert_eq!(
            authority.validate(token.as_str()).await,
            Err(AuthError::Unauthenticated)
        );
    }
    assert_eq!(authority.validate(bob_token.as_str()).await.unwrap(), bob);
}

#[tokio::test]
async fn guard_applies_route_policy() {
    let Fixture { authority, .. } = fixture(1800, TokenStyle::Random128);
    let entitlements = StaticEntitlementSource::new()
        .grant_roles("root", ["admin"])
        .grant_permissions("root", ["session.revoke", "session.read"]);
    let guard = AuthGuard::new(authority.clone(), Arc::new(entitlements));

    let root = authority.issue(&LoginId::from("root")).await.unwrap();
    let guest = authority.issue(&LoginId::from("guest")).await.unwrap();

    let admin_only = RoutePolicy::requiring(Requirement::roles(["admin"], Logical::Or));
    let context = guard
        .authorize(Some(root.as_str()), &admin_only)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(context.login_id, LoginId::from("root"));
    assert_eq!(
        guard.authorize(Some(guest.as_str()), &admin_only).await,
        Err(AuthError::Forbidden)
    );

    let both = RoutePolicy::requiring(Requirement::permissions(
        ["session.revoke", "session.read"],
        Logical::And,
    ));
    let handled = guard
        .run(Some(root.as_str()), &both, |context| async move {
            Ok(context.map(|context| context.login_id))
        })
        .await
        .unwrap();
    assert_eq!(handled, Some(LoginId::from("root")));
}
