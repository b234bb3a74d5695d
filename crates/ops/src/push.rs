//! Push: replace a browser's bookmarks with the store's
//!
//! A push never merges. The target ends up holding exactly the store's two
//! roots, or, if anything fails, exactly what it held before.

use crate::backup::BackupManager;
use crate::handle::StoreHandle;
use crate::task::{each_browser, Control};
use crate::BrowserOutcome;
use marksync_codec::BookmarkCodec;
use marksync_core::{Error, Forest, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushStats {
    pub nodes_written: usize,
    /// Snapshot of the previous file, if there was one
    pub backup: Option<PathBuf>,
}

/// Push the store to every codec; failures are reported per browser
pub fn push(
    handle: &StoreHandle,
    codecs: &[Arc<dyn BookmarkCodec>],
    backups: &BackupManager,
    control: &Control,
) -> Vec<BrowserOutcome<PushStats>> {
    let forest = Forest::from_store(&handle.lock());
    each_browser(codecs, control, |codec| push_forest(codec, &forest, backups))
}

/// Guarded full replacement of one browser's bookmarks
///
/// Also the flush path for sync's browser-side inserts.
pub fn push_forest(codec: &dyn BookmarkCodec, forest: &Forest, backups: &BackupManager) -> Result<PushStats> {
    let browser = codec.browser();

    // 1. Browser must be closed
    if codec.detect_running() {
        return Err(Error::BrowserRunning(browser));
    }

    // 2. Browser must have a bookmark file to replace
    if !codec.detect_installed() {
        return Err(Error::BrowserNotFound {
            browser,
            path: Some(codec.path().to_path_buf()),
        });
    }

    // 3. Snapshot, write, restore on failure
    let ((), backup) = backups.guarded(browser.as_str(), codec.path(), || codec.write(forest))?;

    let nodes_written = forest.count();
    info!("Pushed {} nodes to {}", nodes_written, browser);
    Ok(PushStats { nodes_written, backup })
}
