//! Crash-safe file replacement

use crate::error::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Atomic write helper
///
/// Writes data to a temporary file next to the target, fsyncs it, renames it
/// over the target and fsyncs the parent directory. Readers see either the
/// old content or the new content, never a mix.
pub fn atomic_write(target: &Path, data: &[u8]) -> Result<()> {
    let dir = parent_dir(target);
    fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;

    let tmp = temp_path(target);
    let write_tmp = || -> std::io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
        file.write_all(data)?;
        file.sync_all()
    };

    if let Err(e) = write_tmp() {
        let _ = fs::remove_file(&tmp);
        return Err(Error::io_at(&tmp, e));
    }

    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::io_at(target, e));
    }

    sync_dir(&dir);
    Ok(())
}

fn parent_dir(target: &Path) -> PathBuf {
    match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "marksync".to_string());
    parent_dir(target).join(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Best effort: the rename is already visible, this only orders it on disk
    if let Ok(handle) = File::open(dir) {
        if let Err(e) = handle.sync_all() {
            tracing::debug!("fsync of {} failed: {}", dir.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
