//! Telegram Session Keeper Library
//!
//! Keeps Telegram user sessions as standalone backup files:
//! - Create a session and request a login code
//! - Complete authentication with the received code
//! - Read the latest service notifications (login codes) from an authorized session
//!
//! While a command runs, the session file is parked at a fixed working path
//! guarded by a lock file and moved back afterwards on every exit path.

pub mod chat;
pub mod config;
pub mod error;
pub mod session;
pub mod telegram;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use session::{SessionLock, StagedSession, Workspace};
pub use telegram::{ApiCredentials, Connector, GrammersConnector, TelegramApi};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
