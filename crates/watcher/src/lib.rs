//! Store file watcher
//!
//! Watches the canonical `bookmarks.json` for edits made outside this
//! process and calls back once per burst of changes. Saves made by this
//! process go through a [`Suppressor`] first so they never trigger a
//! reload of their own output.
//!
//! The parent directory is watched rather than the file itself: atomic
//! saves replace the file by rename, which would orphan a file-level watch.

pub mod debounce;

pub use debounce::{Debouncer, WatchState};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use marksync_core::{Error, Result};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// How long the loop sleeps when nothing is pending
const IDLE_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Quiet period after the last change before reloading
    pub debounce: Duration,
    /// Window after our own save during which changes are ignored
    pub suppress: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            suppress: Duration::from_millis(200),
        }
    }
}

impl From<&marksync_core::config::WatcherConfig> for WatchOptions {
    fn from(config: &marksync_core::config::WatcherConfig) -> Self {
        Self {
            debounce: config.debounce(),
            suppress: config.suppress(),
        }
    }
}

enum Msg {
    Changed,
    Wake,
    Stop,
}

/// Marks upcoming file changes as our own
#[derive(Clone)]
pub struct Suppressor {
    state: Arc<Mutex<Debouncer>>,
    window: Duration,
    wake: Sender<Msg>,
}

impl Suppressor {
    /// Ignore changes for the configured window starting now
    pub fn suppress(&self) {
        self.suppress_for(self.window);
    }

    pub fn suppress_for(&self, window: Duration) {
        self.state.lock().suppress(Instant::now() + window);
        let _ = self.wake.send(Msg::Wake);
    }
}

/// Live watch; dropping it stops the watcher and joins its thread
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    tx: Sender<Msg>,
    thread: Option<JoinHandle<()>>,
    suppressor: Suppressor,
}

impl WatchHandle {
    pub fn suppressor(&self) -> Suppressor {
        self.suppressor.clone()
    }

    pub fn state(&self) -> WatchState {
        self.suppressor.state.lock().state()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        // Stop the OS watcher first so no event races the shutdown
        self.watcher.take();
        let _ = self.tx.send(Msg::Stop);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Store watcher thread panicked");
            }
        }
    }
}

/// Start watching `path`, calling `on_change` after each debounced burst
pub fn watch<F>(path: &Path, options: WatchOptions, on_change: F) -> Result<WatchHandle>
where
    F: FnMut() + Send + 'static,
{
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| Error::validation(format!("not a file path: {}", path.display())))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };

    let (tx, rx) = crossbeam_channel::unbounded();
    let state = Arc::new(Mutex::new(Debouncer::new(options.debounce)));

    let event_tx = tx.clone();
    let wanted = file_name.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if is_relevant(&event, &wanted) {
                    let _ = event_tx.send(Msg::Changed);
                }
            }
            Err(e) => warn!("Watch error: {}", e),
        },
        notify::Config::default(),
    )
    .map_err(notify_err)?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(notify_err)?;

    let loop_state = state.clone();
    let thread = std::thread::Builder::new()
        .name("marksync-watcher".to_string())
        .spawn(move || run_loop(rx, loop_state, on_change))?;

    debug!("Watching {} in {}", file_name.to_string_lossy(), dir.display());

    Ok(WatchHandle {
        watcher: Some(watcher),
        tx: tx.clone(),
        thread: Some(thread),
        suppressor: Suppressor {
            state,
            window: options.suppress,
            wake: tx,
        },
    })
}

fn run_loop<F: FnMut()>(rx: Receiver<Msg>, state: Arc<Mutex<Debouncer>>, mut on_change: F) {
    loop {
        let timeout = state
            .lock()
            .next_wakeup()
            .map(|t| t.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_TICK);

        match rx.recv_timeout(timeout) {
            Ok(Msg::Changed) => {
                if !state.lock().on_event(Instant::now()) {
                    trace!("Change ignored during suppression");
                }
            }
            Ok(Msg::Wake) | Err(RecvTimeoutError::Timeout) => {}
            Ok(Msg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let due = state.lock().poll(Instant::now());
        if due {
            debug!("Store file changed externally");
            on_change();
        }
    }
    debug!("Store watcher stopped");
}

fn is_relevant(event: &notify::Event, file_name: &OsString) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

fn notify_err(e: notify::Error) -> Error {
    Error::Io(std::io::Error::other(format!("file watcher: {e}")))
}
