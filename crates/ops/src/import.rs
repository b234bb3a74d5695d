//! Import: pull browser bookmarks into the store, additively
//!
//! Matching uses the dedup key (normalized url + folder path). New keys are
//! inserted with their folder path recreated; a known key with the same
//! title is skipped; a known key with a different title becomes a
//! [`Conflict`] and the store is left alone until the caller resolves it.

use crate::handle::StoreHandle;
use crate::task::{each_browser, Control};
use crate::BrowserOutcome;
use marksync_codec::BookmarkCodec;
use marksync_core::{
    Browser, DedupKey, Error, FolderPath, Forest, Node, NodeUpdate, Result, RootKind, Store,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct ImportStats {
    pub added: usize,
    pub folders_created: usize,
    pub skipped: usize,
    pub conflicts: Vec<Conflict>,
}

/// Same key on both sides, different titles
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    /// `None` when the incoming copy came from a portable file
    pub browser: Option<Browser>,
    pub path: FolderPath,
    pub url: String,
    pub existing: Uuid,
    pub existing_title: String,
    pub incoming: Node,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepExisting,
    UseIncoming,
}

/// Import from every codec; one browser failing never stops the others
pub fn import(
    handle: &StoreHandle,
    codecs: &[Arc<dyn BookmarkCodec>],
    control: &Control,
) -> Vec<BrowserOutcome<ImportStats>> {
    each_browser(codecs, control, |codec| import_one(handle, codec))
}

fn import_one(handle: &StoreHandle, codec: &dyn BookmarkCodec) -> Result<ImportStats> {
    let browser = codec.browser();

    // 1. Installed?
    if !codec.detect_installed() {
        return Err(Error::BrowserNotFound {
            browser,
            path: Some(codec.path().to_path_buf()),
        });
    }

    // 2. Read outside the lock
    let forest = codec.read()?;

    // 3. Merge into a copy, persist, then swap in
    let mut store = handle.lock();
    let mut next = store.clone();
    let stats = import_forest(&mut next, Some(browser), &forest)?;
    if stats.added > 0 || stats.folders_created > 0 {
        handle.save_locked(&next)?;
        *store = next;
    }

    info!(
        "Imported from {}: {} added, {} skipped, {} conflicts",
        browser,
        stats.added,
        stats.skipped,
        stats.conflicts.len()
    );
    Ok(stats)
}

/// Merge a forest into the store in memory
///
/// Importing the same forest twice adds nothing the second time.
pub fn import_forest(store: &mut Store, browser: Option<Browser>, forest: &Forest) -> Result<ImportStats> {
    let mut index = key_index(store);
    let mut stats = ImportStats::default();

    for root in RootKind::ALL {
        merge_level(
            store,
            &mut index,
            browser,
            &FolderPath::root(root),
            forest.root(root),
            &mut stats,
        )?;
    }
    Ok(stats)
}

/// First node per dedup key, in traversal order
pub(crate) fn key_index(store: &Store) -> HashMap<DedupKey, Uuid> {
    let mut index = HashMap::new();
    for (key, id) in store.url_entries() {
        index.entry(key).or_insert(id);
    }
    index
}

fn merge_level(
    store: &mut Store,
    index: &mut HashMap<DedupKey, Uuid>,
    browser: Option<Browser>,
    path: &FolderPath,
    nodes: &[Node],
    stats: &mut ImportStats,
) -> Result<()> {
    for node in nodes {
        if node.is_folder() {
            let sub = path.child(&node.title);
            let (_, created) = store.ensure_folder_path(&sub)?;
            stats.folders_created += created;
            merge_level(store, index, browser, &sub, &node.children, stats)?;
            continue;
        }

        let key = DedupKey::new(&node.url, path.clone());
        match index.get(&key) {
            Some(&existing) => {
                let current = store.get(existing).ok_or(Error::NodeNotFound(existing))?;
                if current.title == node.title {
                    stats.skipped += 1;
                } else {
                    debug!("Conflict at {}: {:?} vs {:?}", key, current.title, node.title);
                    stats.conflicts.push(Conflict {
                        browser,
                        path: path.clone(),
                        url: node.url.clone(),
                        existing,
                        existing_title: current.title.clone(),
                        incoming: node.clone(),
                    });
                }
            }
            None => {
                let (parent, created) = store.ensure_folder_path(path)?;
                stats.folders_created += created;
                let id = store.insert(parent, incoming_copy(node, browser), None)?;
                index.insert(key, id);
                stats.added += 1;
            }
        }
    }
    Ok(())
}

/// Store-ready copy of a foreign node: fresh ids, provenance kept
pub(crate) fn incoming_copy(node: &Node, browser: Option<Browser>) -> Node {
    let mut copy = node.reidentified(None);
    if copy.source_browser.is_none() {
        copy.source_browser = browser;
    }
    copy
}

/// Apply one conflict decision; returns whether the store changed
pub(crate) fn apply_resolution(store: &mut Store, conflict: &Conflict, resolution: Resolution) -> Result<bool> {
    match resolution {
        Resolution::KeepExisting => Ok(false),
        Resolution::UseIncoming => {
            let preferred = conflict.browser.or(conflict.incoming.preferred_browser);
            store.update(
                conflict.existing,
                NodeUpdate {
                    title: Some(conflict.incoming.title.clone()),
                    preferred_browser: preferred.map(Some),
                    date_modified: Some(conflict.incoming.date_modified),
                    ..Default::default()
                },
            )?;
            Ok(true)
        }
    }
}

/// Apply caller-chosen resolutions and save once
pub fn resolve_conflicts(handle: &StoreHandle, resolutions: &[(Conflict, Resolution)]) -> Result<usize> {
    let mut store = handle.lock();
    let mut next = store.clone();
    let mut applied = 0;
    for (conflict, resolution) in resolutions {
        if apply_resolution(&mut next, conflict, *resolution)? {
            applied += 1;
        }
    }
    if applied > 0 {
        handle.save_locked(&next)?;
        *store = next;
    }
    Ok(applied)
}
