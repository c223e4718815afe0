//! Error types for the session keeper

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Default session file already exists: {}", .0.display())]
    Conflict(PathBuf),

    #[error("Session file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Session file not found: {}", .0.display())]
    SessionNotFound(PathBuf),

    #[error("Session not authenticated")]
    Unauthenticated,

    #[error("Session is locked by another process")]
    SessionLocked,

    #[error("Failed to acquire session lock: {0}")]
    LockError(String),

    #[error("Account has two-step verification enabled, pass its password with --password")]
    PasswordRequired,

    #[error("Two-step verification password is incorrect")]
    InvalidPassword,

    #[error("Phone number is not registered, sign up in an official client first")]
    SignUpRequired,

    #[error("Telegram API error: {0}")]
    TelegramError(String),

    #[error("Failed to move session file to {}: {source}", path.display())]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{original} (additionally, moving the session file to {} failed: {restore})", path.display())]
    RestoreFailed {
        path: PathBuf,
        restore: std::io::Error,
        #[source]
        original: Box<Error>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<grammers_client::InvocationError> for Error {
    fn from(err: grammers_client::InvocationError) -> Self {
        Error::TelegramError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
