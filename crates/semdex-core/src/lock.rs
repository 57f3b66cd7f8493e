//! Advisory per-index writer lock.
//!
//! Mutating operations hold an exclusive OS lock on `<name>.lock` for the
//! whole load → mutate → save section. Search never takes it.

use std::fs::{self, File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::{SemdexError, SemdexResult};

/// Held lock; released on drop (or when the process dies).
#[derive(Debug)]
pub struct IndexLock {
    file: File,
    path: PathBuf,
}

impl IndexLock {
    /// Take the lock at `path`, blocking while another writer holds it.
    pub fn acquire(path: &Path) -> SemdexResult<Self> {
        let file = open_lock_file(path)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                info!("Waiting for another writer to release {}", path.display());
                file.lock().map_err(|e| lock_error(path, e))?;
            }
            Err(TryLockError::Error(e)) => return Err(lock_error(path, e)),
        }

        debug!("Acquired index lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock only if it is free.
    pub fn try_acquire(path: &Path) -> SemdexResult<Option<Self>> {
        let file = open_lock_file(path)?;

        match file.try_lock() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(lock_error(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn lock_error(path: &Path, e: std::io::Error) -> SemdexError {
    SemdexError::IndexLock {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn open_lock_file(path: &Path) -> SemdexResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| lock_error(path, e))?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| lock_error(path, e))
}

impl Drop for IndexLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            debug!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
