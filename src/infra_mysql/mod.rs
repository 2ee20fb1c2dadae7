mod session_store_mysql;

pub use session_store_mysql::*;

mod util;
