use super::error::*;
use crate::application_impl::RequestContext;
use crate::application_port::{CredentialVerifier, SessionAuthority};
use crate::domain_model::*;
use crate::logger::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::http::header::{COOKIE, SET_COOKIE};
use warp::{self, reject};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
        }
    }
}

const BEARER_PREFIX: &str = "Bearer ";

/// Token carried by a request: the `token_name` header first (a `Bearer ` prefix is
/// tolerated), then a cookie of the same name.
pub fn extract_token(headers: &HeaderMap, token_name: &str) -> Option<String> {
    let from_header = headers
        .get(token_name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix(BEARER_PREFIX).unwrap_or(value).trim())
        .filter(|value| !value.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_owned());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == token_name && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

#[derive(Deserialize)]
pub struct IssueRequest {
    pub login_id: LoginId,
    /// Missing counts as empty, which never verifies.
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub token_name: String,
    pub token: Token,
}

pub async fn issue(
    body: IssueRequest,
    credentials: Arc<dyn CredentialVerifier>,
    authority: Arc<dyn SessionAuthority>,
    token_name: Arc<str>,
) -> Result<impl warp::Reply, warp::Rejection> {
    credentials
        .verify(&body.login_id, &body.password)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let token = authority
        .issue(&body.login_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let cookie = format!("{token_name}={token}; Path=/; HttpOnly");
    let response = IssueResponse {
        token_name: token_name.to_string(),
        token,
    };
    Ok(warp::reply::with_header(
        warp::reply::json(&ApiResponse::ok(response)),
        SET_COOKIE,
        cookie,
    ))
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub login_id: LoginId,
    pub expire_at: DateTime<Utc>,
}

pub async fn whoami(
    context: RequestContext,
    authority: Arc<dyn SessionAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let session = authority
        .session(context.token.as_str())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    let response = SessionResponse {
        login_id: session.login_id,
        expire_at: session.expire_at,
    };
    Ok(warp::reply::json(&ApiResponse::ok(response)))
}

pub async fn logout(
    context: RequestContext,
    authority: Arc<dyn SessionAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    authority
        .revoke(context.token.as_str())
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(())))
}

#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub login_id: LoginId,
    pub revoked: u64,
}

pub async fn logout_everywhere(
    context: RequestContext,
    authority: Arc<dyn SessionAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    revoke_all(context.login_id, authority).await
}

pub async fn admin_revoke_all(
    login_id: String,
    context: RequestContext,
    authority: Arc<dyn SessionAuthority>,
) -> Result<impl warp::Reply, warp::Rejection> {
    info!(admin = %context.login_id, target = %login_id, "admin revoking sessions");
    revoke_all(LoginId(login_id), authority).await
}

async fn revoke_all(
    login_id: LoginId,
    authority: Arc<dyn SessionAuthority>,
) -> Result<warp::reply::Json, warp::Rejection> {
    let revoked = authority
        .revoke_all(&login_id)
        .await
        .map_err(ApiErrorCode::from)
        .map_err(reject::custom)?;

    Ok(warp::reply::json(&ApiResponse::ok(RevokeAllResponse {
        login_id,
        revoked,
    })))
}
