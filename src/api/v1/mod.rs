mod error;
mod handler;
mod router;

pub use error::{ApiErrorCode, recover_error};
pub use handler::{ApiResponse, extract_token};
pub use router::{ADMIN_ROLE, routes};
