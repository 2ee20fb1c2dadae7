//! Layered settings: a TOML file, then `TOKENWARD__*` environment overrides.
//! See `bin/settings_demo.rs` for a binary exercising it.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
