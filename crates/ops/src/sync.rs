//! Two-way, additive-only sync between the store and one browser
//!
//! ```text
//!   key only in browser        -> StoreInsert
//!   key only in store          -> BrowserInsert
//!   key in both, browser newer -> StoreUpdate
//!   anything else              -> nothing
//! ```
//!
//! [`SyncAction`] has no delete variant; deletions are never inferred from
//! one side missing something.

use crate::backup::BackupManager;
use crate::handle::StoreHandle;
use crate::import::{incoming_copy, key_index};
use crate::push::push_forest;
use crate::task::{Control, Progress};
use chrono::{DateTime, Utc};
use marksync_codec::BookmarkCodec;
use marksync_core::{Browser, Error, FolderPath, Forest, Node, NodeUpdate, Result, Store};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    StoreInsert {
        path: FolderPath,
        node: Node,
    },
    StoreUpdate {
        target: Uuid,
        path: FolderPath,
        title: String,
        date_modified: DateTime<Utc>,
    },
    BrowserInsert {
        path: FolderPath,
        node: Node,
    },
}

impl SyncAction {
    pub fn is_store_side(&self) -> bool {
        !matches!(self, SyncAction::BrowserInsert { .. })
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::StoreInsert { path, node } => {
                write!(f, "store-insert   {}/{} <{}>", path, node.title, node.url)
            }
            SyncAction::StoreUpdate { path, title, .. } => {
                write!(f, "store-update   {} title={:?}", path, title)
            }
            SyncAction::BrowserInsert { path, node } => {
                write!(f, "browser-insert {}/{} <{}>", path, node.title, node.url)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub browser: Browser,
    pub actions: Vec<SyncAction>,
    /// Browser contents the plan was computed against
    pub remote: Forest,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// (store inserts, store updates, browser inserts)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.actions.iter().fold((0, 0, 0), |(i, u, b), a| match a {
            SyncAction::StoreInsert { .. } => (i + 1, u, b),
            SyncAction::StoreUpdate { .. } => (i, u + 1, b),
            SyncAction::BrowserInsert { .. } => (i, u, b + 1),
        })
    }
}

/// Reconcile the store against a browser snapshot, without side effects
pub fn plan(store: &Store, browser: Browser, remote: Forest) -> SyncPlan {
    let local = key_index(store);
    let mut seen = HashSet::new();
    let mut actions = Vec::new();

    // 1. Walk the browser side
    for (key, node) in remote.url_entries() {
        if !seen.insert(key.clone()) {
            continue;
        }
        match local.get(&key).and_then(|id| store.get(*id)) {
            None => actions.push(SyncAction::StoreInsert {
                path: key.path,
                node: node.clone(),
            }),
            Some(existing) if node.date_modified > existing.date_modified => {
                actions.push(SyncAction::StoreUpdate {
                    target: existing.id,
                    path: key.path,
                    title: node.title.clone(),
                    date_modified: node.date_modified,
                });
            }
            // Equal or older: the store copy stands
            Some(_) => {}
        }
    }

    // 2. Store keys the browser lacks, in store order
    let mut emitted = HashSet::new();
    for (key, id) in store.url_entries() {
        if seen.contains(&key) || !emitted.insert(key.clone()) {
            continue;
        }
        if let Some(node) = store.get(id) {
            actions.push(SyncAction::BrowserInsert {
                path: key.path,
                node: node.clone(),
            });
        }
    }

    debug!("Sync plan for {}: {} actions", browser, actions.len());
    SyncPlan {
        browser,
        actions,
        remote,
    }
}

/// Read the browser and plan against the current store
pub fn plan_sync(handle: &StoreHandle, codec: &dyn BookmarkCodec) -> Result<SyncPlan> {
    let browser = codec.browser();
    if !codec.detect_installed() {
        return Err(Error::BrowserNotFound {
            browser,
            path: Some(codec.path().to_path_buf()),
        });
    }
    let remote = codec.read()?;
    let store = handle.lock();
    Ok(plan(&store, browser, remote))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Apply,
    Skip,
    /// Apply this and every remaining action without asking
    ApplyAll,
}

/// Asked once per action in interactive mode
pub trait Confirm {
    fn confirm(&mut self, action: &SyncAction) -> Decision;
}

impl<F> Confirm for F
where
    F: FnMut(&SyncAction) -> Decision,
{
    fn confirm(&mut self, action: &SyncAction) -> Decision {
        self(action)
    }
}

pub enum ExecMode<'a> {
    Automatic,
    Interactive(&'a mut dyn Confirm),
}

impl<'a> ExecMode<'a> {
    /// Interactive when `sync.debug_mode` is on
    pub fn select(debug_mode: bool, confirm: &'a mut dyn Confirm) -> Self {
        if debug_mode {
            ExecMode::Interactive(confirm)
        } else {
            ExecMode::Automatic
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub store_inserted: usize,
    pub store_updated: usize,
    pub browser_inserted: usize,
    pub skipped: usize,
    /// Store actions that could not be committed; the rest of the run went on
    pub store_errors: Vec<(SyncAction, Error)>,
    /// The single browser flush failed; store actions stay committed
    pub browser_error: Option<Error>,
    pub backup: Option<PathBuf>,
    /// Stopped early; actions not reached count as skipped
    pub cancelled: bool,
}

impl SyncOutcome {
    pub fn is_clean(&self) -> bool {
        self.store_errors.is_empty() && self.browser_error.is_none()
    }
}

/// Apply a plan
///
/// Store actions are committed and saved one at a time, each on a copy that
/// replaces the live store only once it is on disk. A failed store action is
/// recorded and the run continues. Browser inserts are grafted onto the
/// planned snapshot and written once at the end through the guarded push
/// path. Cancellation is checked between actions.
pub fn execute(
    handle: &StoreHandle,
    plan: SyncPlan,
    codec: &dyn BookmarkCodec,
    backups: &BackupManager,
    mut mode: ExecMode<'_>,
    control: &Control,
) -> SyncOutcome {
    let SyncPlan {
        browser,
        actions,
        mut remote,
    } = plan;
    let mut outcome = SyncOutcome::default();
    let mut apply_all = matches!(mode, ExecMode::Automatic);
    let mut pending: Vec<(FolderPath, Node)> = Vec::new();
    let total = actions.len();

    control.emit(Progress::Started { browser });

    // 1. Walk the actions
    for (done, action) in actions.into_iter().enumerate() {
        if control.is_cancelled() {
            outcome.cancelled = true;
            outcome.skipped += total - done;
            info!("Sync with {} cancelled after {} of {} actions", browser, done, total);
            break;
        }

        if !apply_all {
            if let ExecMode::Interactive(confirm) = &mut mode {
                match confirm.confirm(&action) {
                    Decision::Apply => {}
                    Decision::Skip => {
                        debug!("Skipped {}", action);
                        outcome.skipped += 1;
                        continue;
                    }
                    Decision::ApplyAll => apply_all = true,
                }
            }
        }

        control.emit(Progress::Note(format!("[{}/{}] {}", done + 1, total, action)));
        match action {
            SyncAction::BrowserInsert { path, node } => pending.push((path, node)),
            action => match apply_to_store(handle, browser, &action) {
                Ok(()) if matches!(action, SyncAction::StoreInsert { .. }) => outcome.store_inserted += 1,
                Ok(()) => outcome.store_updated += 1,
                Err(e) => {
                    warn!("Could not apply {}: {}", action, e);
                    outcome.store_errors.push((action, e));
                }
            },
        }
    }

    // 2. One browser write for every accepted insert
    if !pending.is_empty() {
        let count = pending.len();
        for (path, node) in pending {
            remote.ensure_folder_mut(&path).push(node);
        }
        remote.renumber();

        control.emit(Progress::Note(format!("Writing {} bookmarks to {}", count, browser)));
        match push_forest(codec, &remote, backups) {
            Ok(stats) => {
                outcome.browser_inserted = count;
                outcome.backup = stats.backup;
            }
            Err(e) => {
                warn!("Browser side of {} sync failed: {}", browser, e);
                outcome.browser_error = Some(e);
            }
        }
    }

    control.emit(Progress::Finished {
        browser,
        ok: outcome.is_clean(),
    });
    info!(
        "Synced {}: {} store inserts, {} store updates, {} browser inserts, {} skipped, {} failed",
        browser,
        outcome.store_inserted,
        outcome.store_updated,
        outcome.browser_inserted,
        outcome.skipped,
        outcome.store_errors.len()
    );
    outcome
}

/// Commit one store-side action on a copy, then swap it in
fn apply_to_store(handle: &StoreHandle, browser: Browser, action: &SyncAction) -> Result<()> {
    let mut store = handle.lock();
    let mut next = store.clone();
    match action {
        SyncAction::StoreInsert { path, node } => {
            let (parent, _) = next.ensure_folder_path(path)?;
            next.insert(parent, incoming_copy(node, Some(browser)), None)?;
        }
        SyncAction::StoreUpdate {
            target,
            title,
            date_modified,
            ..
        } => {
            next.update(
                *target,
                NodeUpdate {
                    title: Some(title.clone()),
                    date_modified: Some(*date_modified),
                    ..Default::default()
                },
            )?;
        }
        SyncAction::BrowserInsert { .. } => return Ok(()),
    }
    handle.save_locked(&next)?;
    *store = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::CancelToken;
    use crate::testing::{codec_for, running_codec, write_browser_file};
    use chrono::Duration;
    use marksync_core::RootKind;
    use std::path::Path;
    use tempfile::TempDir;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn dev_path() -> FolderPath {
        FolderPath::root(RootKind::BookmarkBar).child("Dev")
    }

    fn store_with_github(modified: DateTime<Utc>) -> Store {
        let mut store = Store::new();
        let (dev, _) = store.ensure_folder_path(&dev_path()).unwrap();
        store
            .insert(dev, Node::url("GitHub", "https://github.com").with_dates(at(0), modified), None)
            .unwrap();
        store
    }

    fn remote_with_github(title: &str, modified: DateTime<Utc>) -> Forest {
        let mut remote = Forest::default();
        remote.bookmark_bar.push(
            Node::folder("Dev").with_children(vec![
                Node::url(title, "https://github.com/").with_dates(at(0), modified)
            ]),
        );
        remote
    }

    #[test]
    fn test_newer_browser_copy_plans_store_update() {
        let store = store_with_github(at(10));
        let plan = plan(&store, Browser::Chrome, remote_with_github("GitHub Old", at(20)));

        assert_eq!(plan.actions.len(), 1);
        match &plan.actions[0] {
            SyncAction::StoreUpdate {
                title, date_modified, path, ..
            } => {
                assert_eq!(title, "GitHub Old");
                assert_eq!(*date_modified, at(20));
                assert_eq!(path, &dev_path());
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_equal_or_older_browser_copy_is_noop() {
        let store = store_with_github(at(10));
        assert!(plan(&store, Browser::Chrome, remote_with_github("Other title", at(10))).is_empty());
        assert!(plan(&store, Browser::Chrome, remote_with_github("Other title", at(5))).is_empty());
    }

    #[test]
    fn test_one_sided_keys_plan_inserts() {
        let mut store = store_with_github(at(10));
        let other = store.root_id(RootKind::Other);
        store.insert(other, Node::url("Mine", "https://mine.example"), None).unwrap();

        let mut remote = remote_with_github("GitHub", at(10));
        remote.other.push(Node::folder("Read").with_children(vec![Node::url("Theirs", "https://theirs.example")]));
        // Same url, different folder: a distinct key
        remote.other.push(Node::url("GitHub", "https://github.com"));

        let plan = plan(&store, Browser::Edge, remote);
        assert_eq!(plan.counts(), (2, 0, 1));
        assert!(plan.actions.iter().any(|a| matches!(
            a,
            SyncAction::BrowserInsert { node, .. } if node.title == "Mine"
        )));
    }

    struct Fixture {
        _temp_dir: TempDir,
        handle: StoreHandle,
        backups: BackupManager,
        chrome: PathBuf,
    }

    fn fixture(store: Store, remote: &Forest) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bookmarks.json");
        store.save(&path).unwrap();
        let chrome = temp_dir.path().join("chrome").join("Bookmarks");
        write_browser_file(Browser::Chrome, &chrome, remote);
        Fixture {
            handle: StoreHandle::open(&path).unwrap(),
            backups: BackupManager::new(temp_dir.path().join("backups"), 5),
            chrome,
            _temp_dir: temp_dir,
        }
    }

    fn mixed() -> (Store, Forest) {
        let mut store = store_with_github(at(10));
        let other = store.root_id(RootKind::Other);
        store.insert(other, Node::url("Mine", "https://mine.example"), None).unwrap();
        store.insert(other, Node::url("Mine 2", "https://mine2.example"), None).unwrap();

        let mut remote = remote_with_github("GitHub Old", at(20));
        remote.other.push(Node::url("Theirs", "https://theirs.example"));
        (store, remote)
    }

    fn counts(handle: &StoreHandle, chrome: &Path) -> (usize, usize) {
        let browser = codec_for(Browser::Chrome, chrome).read().unwrap();
        (handle.lock().url_count(), browser.url_count())
    }

    #[test]
    fn test_execute_automatic_applies_everything() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let codec = codec_for(Browser::Chrome, &f.chrome);
        let before = counts(&f.handle, &f.chrome);

        let plan = plan_sync(&f.handle, codec.as_ref()).unwrap();
        let outcome = execute(&f.handle, plan, codec.as_ref(), &f.backups, ExecMode::Automatic, &Control::none());

        assert_eq!(outcome.store_inserted, 1);
        assert_eq!(outcome.store_updated, 1);
        assert_eq!(outcome.browser_inserted, 2);
        assert!(outcome.browser_error.is_none());
        assert!(outcome.backup.is_some());

        let after = counts(&f.handle, &f.chrome);
        assert!(after.0 >= before.0 && after.1 >= before.1);
        assert_eq!(after, (4, 4));

        // Durable, and the browser copy's title won
        let saved = Store::load(f.handle.path()).unwrap();
        let github = saved.find(|n| n.url == "https://github.com").next().unwrap();
        assert_eq!(github.title, "GitHub Old");
        assert_eq!(github.date_modified, at(20));

        // Converged: nothing left to do
        let again = plan_sync(&f.handle, codec.as_ref()).unwrap();
        assert!(again.is_empty(), "{:?}", again.actions);
    }

    #[test]
    fn test_execute_interactive_honours_decisions() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let codec = codec_for(Browser::Chrome, &f.chrome);
        let plan = plan_sync(&f.handle, codec.as_ref()).unwrap();
        let total = plan.actions.len();

        // Skip the first, then apply everything else
        let mut asked = 0;
        let mut confirm = |_: &SyncAction| {
            asked += 1;
            if asked == 1 {
                Decision::Skip
            } else {
                Decision::ApplyAll
            }
        };
        let outcome = execute(
            &f.handle,
            plan,
            codec.as_ref(),
            &f.backups,
            ExecMode::select(true, &mut confirm),
            &Control::none(),
        );

        assert_eq!(asked, 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(
            outcome.store_inserted + outcome.store_updated + outcome.browser_inserted,
            total - 1
        );
    }

    #[test]
    fn test_browser_flush_failure_keeps_store_actions() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let before = std::fs::read(&f.chrome).unwrap();

        let plan = plan_sync(&f.handle, codec_for(Browser::Chrome, &f.chrome).as_ref()).unwrap();
        let running = running_codec(Browser::Chrome, &f.chrome);
        let outcome = execute(&f.handle, plan, running.as_ref(), &f.backups, ExecMode::Automatic, &Control::none());

        assert!(matches!(outcome.browser_error, Some(Error::BrowserRunning(_))));
        assert_eq!(outcome.browser_inserted, 0);
        assert_eq!(outcome.store_inserted, 1);
        assert_eq!(std::fs::read(&f.chrome).unwrap(), before);
        assert_eq!(Store::load(f.handle.path()).unwrap().url_count(), 4);
    }

    #[test]
    fn test_failed_store_action_is_recorded_and_browser_still_flushed() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let codec = codec_for(Browser::Chrome, &f.chrome);
        let plan = plan_sync(&f.handle, codec.as_ref()).unwrap();

        // The update's target disappears between planning and executing
        let target = plan
            .actions
            .iter()
            .find_map(|a| match a {
                SyncAction::StoreUpdate { target, .. } => Some(*target),
                _ => None,
            })
            .unwrap();
        {
            let mut store = f.handle.lock();
            store.delete(target).unwrap();
            f.handle.save_locked(&store).unwrap();
        }

        let outcome = execute(&f.handle, plan, codec.as_ref(), &f.backups, ExecMode::Automatic, &Control::none());

        assert_eq!(outcome.store_errors.len(), 1);
        assert!(matches!(outcome.store_errors[0].0, SyncAction::StoreUpdate { .. }));
        assert!(matches!(outcome.store_errors[0].1, Error::NodeNotFound(_)));
        assert_eq!(outcome.store_inserted, 1);
        assert_eq!(outcome.browser_inserted, 2);
        assert!(!outcome.is_clean());
        // Browser had GitHub + Theirs, gained Mine + Mine 2
        assert_eq!(counts(&f.handle, &f.chrome), (3, 4));
    }

    #[test]
    fn test_failed_save_leaves_live_store_unchanged() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let codec = codec_for(Browser::Chrome, &f.chrome);
        let plan = plan_sync(&f.handle, codec.as_ref()).unwrap();
        let before = f.handle.lock().to_json().unwrap();

        // A directory where the store file was makes every save fail
        std::fs::remove_file(f.handle.path()).unwrap();
        std::fs::create_dir(f.handle.path()).unwrap();

        let outcome = execute(&f.handle, plan, codec.as_ref(), &f.backups, ExecMode::Automatic, &Control::none());

        assert_eq!(outcome.store_errors.len(), 2);
        assert_eq!(outcome.store_inserted + outcome.store_updated, 0);
        assert_eq!(f.handle.lock().to_json().unwrap(), before);
        assert_eq!(outcome.browser_inserted, 2);
        assert!(outcome.browser_error.is_none());
    }

    #[test]
    fn test_cancelled_run_applies_nothing() {
        let (store, remote) = mixed();
        let f = fixture(store, &remote);
        let codec = codec_for(Browser::Chrome, &f.chrome);
        let plan = plan_sync(&f.handle, codec.as_ref()).unwrap();
        let total = plan.actions.len();
        let chrome_before = std::fs::read(&f.chrome).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = execute(
            &f.handle,
            plan,
            codec.as_ref(),
            &f.backups,
            ExecMode::Automatic,
            &Control::new(tx, cancel),
        );

        assert!(outcome.cancelled);
        assert_eq!(outcome.skipped, total);
        assert_eq!(std::fs::read(&f.chrome).unwrap(), chrome_before);
        assert_eq!(rx.try_recv().unwrap(), Progress::Started { browser: Browser::Chrome });
        assert_eq!(
            rx.try_recv().unwrap(),
            Progress::Finished {
                browser: Browser::Chrome,
                ok: true
            }
        );
    }

    #[test]
    fn test_plan_never_shrinks_either_side() {
        for offset in [-5i64, 0, 5] {
            let (store, mut remote) = mixed();
            remote.bookmark_bar[0].children[0].date_modified = at(10) + Duration::seconds(offset);
            let plan = plan(&store, Browser::Chrome, remote);
            let (inserts, updates, browser_inserts) = plan.counts();
            assert_eq!(inserts + updates + browser_inserts, plan.actions.len());
            assert_eq!(updates, usize::from(offset > 0));
        }
    }
}
