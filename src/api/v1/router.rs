use super::error::*;
use super::handler;
use crate::application_impl::{AuthGuard, RequestContext};
use crate::domain_model::*;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::{HeaderMap, StatusCode};
use warp::{Filter, reject};

pub const ADMIN_ROLE: &str = "admin";

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let token_name: Arc<str> = Arc::from(server.token_name.as_str());

    // CORS preflight never carries credentials
    let preflight = warp::options()
        .and(warp::path::tail())
        .map(|_| StatusCode::NO_CONTENT);

    let issue = warp::post()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and(with(server.credentials.clone()))
        .and(with(server.authority.clone()))
        .and(with(token_name.clone()))
        .and_then(handler::issue);

    let whoami = warp::get()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_guard(
            server.guard.clone(),
            token_name.clone(),
            RoutePolicy::authenticated(),
        ))
        .and(with(server.authority.clone()))
        .and_then(handler::whoami);

    let logout = warp::delete()
        .and(warp::path("session"))
        .and(warp::path::end())
        .and(with_guard(
            server.guard.clone(),
            token_name.clone(),
            RoutePolicy::authenticated(),
        ))
        .and(with(server.authority.clone()))
        .and_then(handler::logout);

    let logout_everywhere = warp::delete()
        .and(warp::path!("session" / "all"))
        .and(with_guard(
            server.guard.clone(),
            token_name.clone(),
            RoutePolicy::authenticated(),
        ))
        .and(with(server.authority.clone()))
        .and_then(handler::logout_everywhere);

    let admin_revoke_all = warp::delete()
        .and(warp::path!("admin" / "sessions" / String))
        .and(with_guard(
            server.guard.clone(),
            token_name,
            RoutePolicy::requiring(Requirement::roles([ADMIN_ROLE], Logical::Or)),
        ))
        .and(with(server.authority.clone()))
        .and_then(handler::admin_revoke_all);

    preflight
        .or(issue)
        .or(whoami)
        .or(logout)
        .or(logout_everywhere)
        .or(admin_revoke_all)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn with_guard(
    guard: Arc<AuthGuard>,
    token_name: Arc<str>,
    policy: RoutePolicy,
) -> impl Filter<Extract = (RequestContext,), Error = warp::Rejection> + Clone {
    warp::header::headers_cloned().and_then(move |headers: HeaderMap| {
        let guard = guard.clone();
        let token_name = token_name.clone();
        let policy = policy.clone();
        async move {
            let token = handler::extract_token(&headers, &token_name);
            guard
                .authorize(token.as_deref(), &policy)
                .await
                .map_err(ApiErrorCode::from)
                .map_err(reject::custom)?
                .ok_or_else(|| reject::custom(ApiErrorCode::Unauthenticated))
        }
    })
}
