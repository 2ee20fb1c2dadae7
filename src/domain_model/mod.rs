mod requirement;
mod session;

pub use requirement::*;
pub use session::*;
