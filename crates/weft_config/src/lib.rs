//! Parsing and validation of `weft.toml` IR construction settings.
//!
//! The file has a global `[ir]` table and optional `[scopes.<name>]` tables
//! that override it for individual scopes. [`resolve_scope`] merges the two
//! into the [`ScopeSettings`] a new scope is created with.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_scope, ScopeSettings};
pub use types::*;
