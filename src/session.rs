//! Session file handling
//!
//! Provides:
//! - File-based workspace locking to prevent parallel execution
//! - Precondition checks on the working path and the session path
//! - Staging of a session file at the working path with guaranteed restore

use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// Lock guard that ensures exclusive access to the working path.
pub struct SessionLock {
    lock_file: Option<File>,
    path: PathBuf,
}

impl SessionLock {
    /// Acquire an exclusive lock, failing fast if another process holds it.
    pub fn acquire(path: &Path) -> Result<Self> {
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::LockError(format!("Failed to open lock file: {}", e)))?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                lock_file: Some(lock_file),
                path: path.to_path_buf(),
            }),
            Err(_) => Err(Error::SessionLocked),
        }
    }

    /// Release the lock manually
    pub fn release(&mut self) {
        if let Some(file) = self.lock_file.take() {
            // Unlink while still holding the lock so nobody can lock the old inode
            // while a new lock file appears at the same path.
            let _ = fs::remove_file(&self.path);
            let _ = file.unlock();
        }
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        self.release();
    }
}

/// The fixed working path plus its lock.
#[derive(Debug, Clone)]
pub struct Workspace {
    working_path: PathBuf,
    lock_path: PathBuf,
}

impl Workspace {
    pub fn new(working_path: impl Into<PathBuf>, lock_path: impl Into<PathBuf>) -> Self {
        Self {
            working_path: working_path.into(),
            lock_path: lock_path.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.working_path, &config.lock_file)
    }

    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn lock(&self) -> Result<SessionLock> {
        SessionLock::acquire(&self.lock_path)
    }

    /// Fail with `Conflict` if a session file is parked at the working path.
    pub fn ensure_vacant(&self) -> Result<()> {
        if self.working_path.exists() {
            return Err(Error::Conflict(self.working_path.clone()));
        }
        Ok(())
    }

    /// Move `session` to the working path. The returned guard moves it back.
    pub fn stage(&self, session: &Path) -> Result<StagedSession> {
        move_file(session, &self.working_path)?;
        debug!(
            from = %session.display(),
            to = %self.working_path.display(),
            "Session staged"
        );
        Ok(StagedSession {
            working_path: self.working_path.clone(),
            home: session.to_path_buf(),
            restored: false,
        })
    }
}

/// Fail with `AlreadyExists` if `session` is taken.
pub fn ensure_session_absent(session: &Path) -> Result<()> {
    if session.exists() {
        return Err(Error::AlreadyExists(session.to_path_buf()));
    }
    Ok(())
}

/// Fail with `SessionNotFound` unless `session` is a file.
pub fn ensure_session_present(session: &Path) -> Result<()> {
    if !session.is_file() {
        return Err(Error::SessionNotFound(session.to_path_buf()));
    }
    Ok(())
}

/// A session file temporarily parked at the working path.
///
/// Call [`StagedSession::restore`] to move it back and observe failures.
/// A guard dropped without that (panic, cancelled future) restores
/// best-effort and logs the outcome.
#[derive(Debug)]
pub struct StagedSession {
    working_path: PathBuf,
    home: PathBuf,
    restored: bool,
}

impl StagedSession {
    pub fn working_path(&self) -> &Path {
        &self.working_path
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn restore(mut self) -> io::Result<()> {
        self.restored = true;
        move_file(&self.working_path, &self.home)?;
        debug!(to = %self.home.display(), "Session restored");
        Ok(())
    }
}

impl Drop for StagedSession {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        match move_file(&self.working_path, &self.home) {
            Ok(()) => warn!(to = %self.home.display(), "Session restored after abnormal exit"),
            Err(err) => error!(
                from = %self.working_path.display(),
                to = %self.home.display(),
                "Failed to restore session: {}",
                err
            ),
        }
    }
}

/// Run `body` with the session staged, then move it back on every exit path.
///
/// A restore failure never hides the body's error: when both fail the result
/// is `RestoreFailed` carrying both.
pub async fn with_staged_session<T, F>(staged: StagedSession, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let outcome = body.await;
    let home = staged.home().to_path_buf();

    match (outcome, staged.restore()) {
        (Ok(value), Ok(())) => Ok(value),
        (Err(err), Ok(())) => Err(err),
        (Ok(_), Err(restore)) => Err(Error::Restore {
            path: home,
            source: restore,
        }),
        (Err(original), Err(restore)) => Err(Error::RestoreFailed {
            path: home,
            restore,
            original: Box::new(original),
        }),
    }
}

/// Move a file without ever replacing an existing destination.
///
/// Falls back to copy and remove when a plain rename is refused, e.g. across
/// filesystems.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if to.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }

    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if !from.is_file() {
                return Err(rename_err);
            }
            if fs::copy(from, to).is_err() {
                let _ = fs::remove_file(to);
                return Err(rename_err);
            }
            fs::remove_file(from)
        }
    }
}
