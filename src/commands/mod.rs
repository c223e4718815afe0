//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI. Commands take the
//! connector, the workspace and an output sink so they can run against a
//! stub client in tests.

pub mod auth;
pub mod create;
pub mod read;

// Re-export commonly used types
pub use auth::{run as auth_run, AuthArgs};
pub use create::{run as create_run, CreateArgs};
pub use read::{run as read_run, ReadArgs};
