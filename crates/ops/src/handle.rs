//! Shared ownership of the canonical store
//!
//! Every mutation, whether it comes from an orchestrator or an interactive
//! edit, goes through [`StoreHandle::lock`]. Saving arms the watcher's
//! suppression window so our own writes never bounce back as reloads.

use marksync_core::{Result, Store};
use marksync_watcher::{Suppressor, WatchHandle, WatchOptions};
use parking_lot::{Mutex, MutexGuard};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<Mutex<Store>>,
    path: PathBuf,
    suppressor: Arc<Mutex<Option<Suppressor>>>,
}

/// Open the canonical store, starting empty on first launch
pub fn load_store(path: &Path) -> Result<StoreHandle> {
    StoreHandle::open(path)
}

pub fn save_store(handle: &StoreHandle) -> Result<()> {
    handle.save()
}

impl StoreHandle {
    pub fn new(store: Store, path: impl Into<PathBuf>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            path: path.into(),
            suppressor: Arc::new(Mutex::new(None)),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let store = Store::open(path)?;
        debug!("Opened store {} ({} nodes)", path.display(), store.len());
        Ok(Self::new(store, path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The single critical section around the store
    pub fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock()
    }

    pub fn save(&self) -> Result<()> {
        let store = self.lock();
        self.save_locked(&store)
    }

    /// Persist `store` while the caller already holds the lock
    ///
    /// Also used to persist a candidate store before swapping it in, so a
    /// failed save leaves memory and disk agreeing.
    pub fn save_locked(&self, store: &Store) -> Result<()> {
        self.suppress();
        store.save(&self.path)?;
        // Re-arm: the rename may be reported after the window opened
        self.suppress();
        debug!("Saved store to {}", self.path.display());
        Ok(())
    }

    /// Replace the in-memory store with the file on disk
    ///
    /// A store that fails to load leaves the current one in place.
    pub fn reload(&self) -> Result<()> {
        match Store::load(&self.path) {
            Ok(fresh) => {
                let count = fresh.len();
                *self.lock() = fresh;
                info!("Reloaded store from {} ({} nodes)", self.path.display(), count);
                Ok(())
            }
            Err(e) => {
                warn!("Keeping current store, reload failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn attach_suppressor(&self, suppressor: Suppressor) {
        *self.suppressor.lock() = Some(suppressor);
    }

    fn suppress(&self) {
        if let Some(s) = self.suppressor.lock().as_ref() {
            s.suppress();
        }
    }

    /// Watch the store file: reload on external change, then call `on_change`
    pub fn watch<F>(&self, options: WatchOptions, mut on_change: F) -> Result<WatchHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let handle = self.clone();
        let watch = marksync_watcher::watch(&self.path, options, move || {
            if handle.reload().is_ok() {
                on_change();
            }
        })?;
        self.attach_suppressor(watch.suppressor());
        Ok(watch)
    }
}
