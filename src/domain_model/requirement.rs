use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How the declared values of a requirement combine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Logical {
    And,
    Or,
    /// Operator name that is neither `and` nor `or`. Never satisfied.
    Unrecognized(String),
}

impl From<&str> for Logical {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "and" => Logical::And,
            "or" => Logical::Or,
            _ => Logical::Unrecognized(value.to_owned()),
        }
    }
}

impl From<String> for Logical {
    fn from(value: String) -> Self {
        Logical::from(value.as_str())
    }
}

impl From<Logical> for String {
    fn from(value: Logical) -> Self {
        match value {
            Logical::And => "and".to_owned(),
            Logical::Or => "or".to_owned(),
            Logical::Unrecognized(other) => other,
        }
    }
}

/// Permission or role requirement attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    #[default]
    None,
    Permissions {
        values: HashSet<String>,
        logical: Logical,
    },
    Roles {
        values: HashSet<String>,
        logical: Logical,
    },
}

impl Requirement {
    pub fn permissions<I, S>(values: I, logical: Logical) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Permissions {
            values: values.into_iter().map(Into::into).collect(),
            logical,
        }
    }

    pub fn roles<I, S>(values: I, logical: Logical) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Roles {
            values: values.into_iter().map(Into::into).collect(),
            logical,
        }
    }
}

/// Per-route authentication policy registered alongside the handler.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    pub skip_auth: bool,
    pub requirement: Requirement,
}

impl RoutePolicy {
    /// Route reachable without a session.
    pub fn public() -> Self {
        RoutePolicy {
            skip_auth: true,
            requirement: Requirement::None,
        }
    }

    /// Any valid session is enough.
    pub fn authenticated() -> Self {
        RoutePolicy::default()
    }

    pub fn requiring(requirement: Requirement) -> Self {
        RoutePolicy {
            skip_auth: false,
            requirement,
        }
    }
}
