//! Pre-write snapshots of browser files and the canonical store
//!
//! Backups live flat in one directory, named
//! `<label>_<file>.<YYYYmmdd_HHMMSS_ffffff>.bak`, so a listing sorts by
//! target and then by age.
//!
//! SQLite sidecars (`-wal`, `-shm`) next to a target travel with it: they are
//! copied as `<backup>-wal` and `<backup>-shm`, and a restore puts them back
//! or removes stale ones so the database is never paired with a foreign log.

use chrono::{NaiveDateTime, Utc};
use marksync_core::fs::atomic_write;
use marksync_core::{AppPaths, Config, Error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

const SIDECARS: [&str; 2] = ["-wal", "-shm"];

/// `places.sqlite` + `-wal` → `places.sqlite-wal`
fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(Error::io_at(path, e)),
        _ => Ok(()),
    }
}

/// One backup file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    /// Who took it: a browser name or `store`
    pub label: String,
    /// File name of the original target
    pub target: String,
    pub created: NaiveDateTime,
    pub size: u64,
}

impl BackupEntry {
    fn parse(path: &Path, size: u64) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".bak")?;
        let (prefix, stamp) = stem.rsplit_once('.')?;
        let (label, target) = prefix.split_once('_')?;
        let created = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            label: label.to_string(),
            target: target.to_string(),
            created,
            size,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
    /// Backups kept per label and target; 0 keeps everything
    keep: usize,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            dir: dir.into(),
            keep,
        }
    }

    pub fn from_config(paths: &AppPaths, config: &Config) -> Self {
        Self::new(paths.backup_dir(), config.backup.keep)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `target` into the backup directory
    ///
    /// Returns `None` when there is nothing to back up yet. Any failure is a
    /// [`Error::BackupFailure`] and the caller must not go on to write.
    pub fn snapshot(&self, label: &str, target: &Path) -> Result<Option<PathBuf>> {
        if !target.exists() {
            debug!("Nothing to back up at {}", target.display());
            return Ok(None);
        }

        fs::create_dir_all(&self.dir).map_err(|source| Error::BackupFailure {
            path: self.dir.clone(),
            source,
        })?;

        let file = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "target".to_string());
        let stamp = Utc::now().format(STAMP_FORMAT);
        let backup = self.dir.join(format!("{label}_{file}.{stamp}.bak"));

        fs::copy(target, &backup).map_err(|source| Error::BackupFailure {
            path: backup.clone(),
            source,
        })?;
        for suffix in SIDECARS {
            let live = sidecar(target, suffix);
            if live.exists() {
                let copy = sidecar(&backup, suffix);
                fs::copy(&live, &copy).map_err(|source| Error::BackupFailure { path: copy, source })?;
            }
        }
        info!("Backed up {} to {}", target.display(), backup.display());

        if let Err(e) = self.prune(label, &file) {
            warn!("Failed to prune old backups: {}", e);
        }
        Ok(Some(backup))
    }

    /// Put a backup's bytes back over `target`, atomically
    ///
    /// Sidecars follow the backup: saved ones are written back and any the
    /// backup did not have are deleted.
    pub fn restore(&self, backup: &Path, target: &Path) -> Result<()> {
        let data = fs::read(backup).map_err(|e| Error::io_at(backup, e))?;
        atomic_write(target, &data)?;
        for suffix in SIDECARS {
            let saved = sidecar(backup, suffix);
            let live = sidecar(target, suffix);
            if saved.exists() {
                let data = fs::read(&saved).map_err(|e| Error::io_at(&saved, e))?;
                atomic_write(&live, &data)?;
            } else {
                remove_if_present(&live)?;
            }
        }
        info!("Restored {} from {}", target.display(), backup.display());
        Ok(())
    }

    /// Snapshot, run `write`, and roll the target back if it fails
    ///
    /// When there was no original file, a file left behind by the failed
    /// write is removed instead.
    pub fn guarded<T, F>(&self, label: &str, target: &Path, write: F) -> Result<(T, Option<PathBuf>)>
    where
        F: FnOnce() -> Result<T>,
    {
        let backup = self.snapshot(label, target)?;

        match write() {
            Ok(value) => Ok((value, backup)),
            Err(e) => {
                warn!("Write to {} failed: {}", target.display(), e);
                match &backup {
                    Some(b) => {
                        if let Err(re) = self.restore(b, target) {
                            warn!("Failed to restore {} from {}: {}", target.display(), b.display(), re);
                        }
                    }
                    None => {
                        let partial = std::iter::once(target.to_path_buf())
                            .chain(SIDECARS.iter().map(|s| sidecar(target, s)));
                        for file in partial {
                            if let Err(re) = remove_if_present(&file) {
                                warn!("Failed to remove partial {}: {}", file.display(), re);
                            }
                        }
                    }
                }
                Err(e)
            }
        }
    }

    /// Every backup in the directory, newest first
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if let Some(parsed) = BackupEntry::parse(entry.path(), size) {
                entries.push(parsed);
            }
        }
        entries.sort_by(|a, b| b.created.cmp(&a.created).then_with(|| b.path.cmp(&a.path)));
        Ok(entries)
    }

    /// Accept either a path or a bare backup file name
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Some(direct);
        }
        let inside = self.dir.join(name);
        inside.is_file().then_some(inside)
    }

    fn prune(&self, label: &str, target: &str) -> Result<()> {
        if self.keep == 0 {
            return Ok(());
        }
        let stale: Vec<BackupEntry> = self
            .list()?
            .into_iter()
            .filter(|e| e.label == label && e.target == target)
            .skip(self.keep)
            .collect();

        for entry in stale {
            debug!("Pruning backup {}", entry.path.display());
            fs::remove_file(&entry.path).map_err(|e| Error::io_at(&entry.path, e))?;
            for suffix in SIDECARS {
                remove_if_present(&sidecar(&entry.path, suffix))?;
            }
        }
        Ok(())
    }
}
