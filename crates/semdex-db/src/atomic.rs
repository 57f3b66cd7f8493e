//! Temp-then-rename file replacement.
//!
//! A reader either sees the previous file or the complete new one, never a
//! partially written file. On failure the temp file is removed and the target
//! is left untouched.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::{DbError, DbResult};

/// `knowledge/docs.meta.json` → `knowledge/docs.meta.json.tmp`
pub fn temp_path_for(target: &Path) -> PathBuf {
    let mut name: OsString = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

/// Atomically replace `target` with `bytes`.
pub fn atomic_write(target: &Path, bytes: &[u8]) -> DbResult<()> {
    atomic_replace_with(target, |temp| {
        let mut file =
            File::create(temp).map_err(|e| DbError::write_failure(temp, e.to_string()))?;
        file.write_all(bytes)
            .map_err(|e| DbError::write_failure(temp, e.to_string()))?;
        file.flush()
            .map_err(|e| DbError::write_failure(temp, format!("flush failed: {}", e)))?;
        file.sync_all()
            .map_err(|e| DbError::write_failure(temp, format!("sync failed: {}", e)))?;
        Ok(())
    })
}

/// Atomically replace `target` with whatever `write` produces at the temp path.
///
/// For writers that insist on owning the file themselves (the HNSW index
/// serializes straight to a path).
pub fn atomic_replace_with<F>(target: &Path, write: F) -> DbResult<()>
where
    F: FnOnce(&Path) -> DbResult<()>,
{
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| DbError::write_failure(parent, e.to_string()))?;
        }
    }

    let temp = temp_path_for(target);
    if let Err(e) = write(&temp) {
        discard(&temp);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, target) {
        discard(&temp);
        return Err(DbError::write_failure(
            target,
            format!("failed to rename temp file into place: {}", e),
        ));
    }

    trace!("Replaced {:?}", target);
    Ok(())
}

fn discard(temp: &Path) {
    if temp.exists() {
        if let Err(e) = fs::remove_file(temp) {
            warn!("Failed to remove temp file {:?}: {}", temp, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_keeps_full_name() {
        let temp = temp_path_for(Path::new("/x/knowledge/docs.meta.json"));
        assert_eq!(temp, PathBuf::from("/x/knowledge/docs.meta.json.tmp"));
    }

    #[test]
    fn test_atomic_write_creates_and_replaces() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("state.json");

        atomic_write(&target, b"first").unwrap();
        atomic_write(&target, b"second").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        assert!(!temp_path_for(&target).exists());
    }

    #[test]
    fn test_failed_writer_leaves_target_untouched() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("state.json");
        atomic_write(&target, b"committed").unwrap();

        let result = atomic_replace_with(&target, |temp| {
            fs::write(temp, b"half").unwrap();
            Err(DbError::write_failure(temp, "disk full"))
        });

        assert!(matches!(result, Err(DbError::WriteFailure { .. })));
        assert_eq!(fs::read_to_string(&target).unwrap(), "committed");
        assert!(!temp_path_for(&target).exists());
    }
}
