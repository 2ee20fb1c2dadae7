use super::policy_evaluator;
use crate::application_port::*;
use crate::domain_model::*;
use crate::logger::*;
use std::future::Future;
use std::sync::Arc;

/// Identity attached to a request that passed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub login_id: LoginId,
    pub token: Token,
}

/// Per-request gate: authenticate the caller's token, then check the route's
/// permission or role requirement against the caller's entitlements.
pub struct AuthGuard {
    authority: Arc<dyn SessionAuthority>,
    entitlements: Arc<dyn EntitlementSource>,
}

impl AuthGuard {
    pub fn new(
        authority: Arc<dyn SessionAuthority>,
        entitlements: Arc<dyn EntitlementSource>,
    ) -> Self {
        AuthGuard {
            authority,
            entitlements,
        }
    }

    /// `Ok(None)` for routes that skip authentication, otherwise the caller's context.
    ///
    /// A store outage while authenticating is reported as `Unauthenticated`; the
    /// request is never let through on it.
    pub async fn authorize(
        &self,
        token: Option<&str>,
        policy: &RoutePolicy,
    ) -> Result<Option<RequestContext>, AuthError> {
        if policy.skip_auth {
            return Ok(None);
        }

        let token = token.ok_or(AuthError::Unauthenticated)?;
        let login_id = match self.authority.validate(token).await {
            Ok(login_id) => login_id,
            Err(AuthError::StoreUnavailable(e)) => {
                warn!(error = %e, "session store unavailable, rejecting request");
                return Err(AuthError::Unauthenticated);
            }
            Err(e) => return Err(e),
        };

        let entitlements = match &policy.requirement {
            Requirement::None => Default::default(),
            Requirement::Permissions { .. } => self.entitlements.permissions(&login_id).await?,
            Requirement::Roles { .. } => self.entitlements.roles(&login_id).await?,
        };
        if !policy_evaluator::check(&policy.requirement, &entitlements) {
            debug!(%login_id, requirement = ?policy.requirement, "requirement not met");
            return Err(AuthError::Forbidden);
        }

        Ok(Some(RequestContext {
            login_id,
            token: Token::from(token),
        }))
    }

    /// Run `next` only when the request passes [`AuthGuard::authorize`].
    pub async fn run<F, Fut, T>(
        &self,
        token: Option<&str>,
        policy: &RoutePolicy,
        next: F,
    ) -> Result<T, AuthError>
    where
        F: FnOnce(Option<RequestContext>) -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        let context = self.authorize(token, policy).await?;
        next(context).await
    }
}
