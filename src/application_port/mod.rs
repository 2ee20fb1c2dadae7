mod auth_error;
mod credential_verifier;
mod entitlement_source;
mod session_authority;

pub use auth_error::*;
pub use credential_verifier::*;
pub use entitlement_source::*;
pub use session_authority::*;
