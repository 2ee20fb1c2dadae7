//! Matching of declared permission/role requirements against an entitlement set.

use crate::domain_model::*;
use std::collections::HashSet;

/// `true` when `entitlements` satisfies `requirement`.
///
/// `Or` needs at least one declared value (so an empty declaration never matches),
/// `And` needs all of them (so an empty declaration always matches), and an
/// unrecognised operator never matches.
pub fn check(requirement: &Requirement, entitlements: &HashSet<String>) -> bool {
    match requirement {
        Requirement::None => true,
        Requirement::Permissions { values, logical } | Requirement::Roles { values, logical } => {
            match logical {
                Logical::Or => values.iter().any(|v| entitlements.contains(v)),
                Logical::And => values.is_subset(entitlements),
                Logical::Unrecognized(_) => false,
            }
        }
    }
}
