use crate::application_port::{AuthError, EntitlementSource};
use crate::domain_model::LoginId;
use crate::settings::Entitlements;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
struct Grants {
    permissions: HashSet<String>,
    roles: HashSet<String>,
}

/// Fixed permission/role table loaded at startup. Login ids without an entry hold
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct StaticEntitlementSource {
    grants: HashMap<LoginId, Grants>,
}

impl StaticEntitlementSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(entitlements: &HashMap<String, Entitlements>) -> Self {
        let mut source = Self::new();
        for (login_id, entry) in entitlements {
            source = source
                .grant_permissions(login_id.as_str(), entry.permissions.iter().cloned())
                .grant_roles(login_id.as_str(), entry.roles.iter().cloned());
        }
        source
    }

    pub fn grant_permissions<I, S>(mut self, login_id: impl Into<LoginId>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .entry(login_id.into())
            .or_default()
            .permissions
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn grant_roles<I, S>(mut self, login_id: impl Into<LoginId>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .entry(login_id.into())
            .or_default()
            .roles
            .extend(values.into_iter().map(Into::into));
        self
    }
}

#[async_trait::async_trait]
impl EntitlementSource for StaticEntitlementSource {
    async fn permissions(&self, login_id: &LoginId) -> Result<HashSet<String>, AuthError> {
        Ok(self
            .grants
            .get(login_id)
            .map(|grants| grants.permissions.clone())
            .unwrap_or_default())
    }

    async fn roles(&self, login_id: &LoginId) -> Result<HashSet<String>, AuthError> {
        Ok(self
            .grants
            .get(login_id)
            .map(|grants| grants.roles.clone())
            .unwrap_or_default())
    }
}
