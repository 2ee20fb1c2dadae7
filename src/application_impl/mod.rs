mod auth_guard;
mod credential_verifier_argon2;
mod entitlement_source_static;
pub mod policy_evaluator;
mod session_authority_impl;

pub use auth_guard::*;
pub use credential_verifier_argon2::*;
pub use entitlement_source_static::*;
pub use session_authority_impl::*;
