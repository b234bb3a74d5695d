//! Operations over the canonical store and the browsers
//!
//! This crate provides:
//! - [`StoreHandle`]: the single mutation lock around the store
//! - [`BackupManager`]: snapshot before write, restore on failure
//! - Import, push and sync orchestrators
//! - Portable store file import/export
//! - Background execution with progress and cancellation ([`task`])

pub mod backup;
pub mod handle;
pub mod import;
pub mod portable;
pub mod push;
pub mod sync;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use backup::{BackupEntry, BackupManager};
pub use handle::{load_store, save_store, StoreHandle};
pub use import::{import, import_forest, resolve_conflicts, Conflict, ImportStats, Resolution};
pub use portable::{execute_file_import, export_store, plan_file_import, FileImportMode, FileImportOutcome, FileImportPreview};
pub use push::{push, push_forest, PushStats};
pub use sync::{execute, plan, plan_sync, Confirm, Decision, ExecMode, SyncAction, SyncOutcome, SyncPlan};
pub use task::{spawn, CancelToken, Control, Progress, TaskHandle};

pub use marksync_watcher::{watch, WatchHandle, WatchOptions};

use marksync_core::{Browser, Result};

/// Result of one browser's part in a multi-browser operation
#[derive(Debug)]
pub struct BrowserOutcome<T> {
    pub browser: Browser,
    pub result: Result<T>,
}
