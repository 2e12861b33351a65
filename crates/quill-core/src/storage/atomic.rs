//! Atomic whole-file replacement
//!
//! 1. Write the full content to a temporary file in the target's directory
//! 2. Sync it to stable storage and close it
//! 3. Rename it over the target path
//!
//! The target is never observed partially written. If anything fails before
//! the rename completes, the temporary file is removed and the previous
//! target is left untouched.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::error::{StorageError, StorageResult};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `data` to `path` atomically
pub fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    write_then_commit(path, data, |from, to| fs::rename(from, to))
}

/// Removes the temporary file on drop unless the write was committed.
struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!("Failed to remove temp file {:?}: {}", self.path, e);
                }
            }
        }
    }
}

/// Shared body of [`atomic_write`] with the final rename step injectable.
pub(crate) fn write_then_commit<F>(path: &Path, data: &[u8], commit: F) -> StorageResult<()>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDirectory {
        path: dir.clone(),
        source,
    })?;

    let temp_path = temp_path_for(&dir, path);
    let mut guard = TempFileGuard::new(temp_path.clone());

    {
        let mut file = File::create(&temp_path)
            .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
        file.write_all(data)
            .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
        file.sync_all()
            .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    }

    commit(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;
    guard.disarm();

    sync_dir(&dir);
    Ok(())
}

/// Unique sibling name: `.<file>.<pid>.<n>.tmp`
fn temp_path_for(dir: &Path, target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!(".{}.{}.{}.tmp", name, std::process::id(), n))
}

/// Best effort: persist the rename itself.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
