//! Portable store files: full store dumps for moving bookmarks by hand

use crate::backup::BackupManager;
use crate::handle::StoreHandle;
use crate::import::{apply_resolution, incoming_copy, key_index, Conflict, Resolution};
use marksync_core::{FolderPath, Forest, Node, Result, Store};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the whole store to `path`
pub fn export_store(store: &Store, path: &Path) -> Result<()> {
    store.save(path)?;
    info!("Exported {} bookmarks to {}", store.url_count(), path.display());
    Ok(())
}

/// What loading a portable file would do to the store
#[derive(Debug, Clone)]
pub struct FileImportPreview {
    /// The file, validated
    pub incoming: Store,
    pub to_add: Vec<(FolderPath, Node)>,
    pub skipped: usize,
    pub conflicts: Vec<Conflict>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileImportMode {
    /// Replace the whole store with the file
    Overwrite,
    /// Add what is new, apply the conflict resolution to the rest
    Merge,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileImportOutcome {
    pub added: usize,
    pub resolved: usize,
    /// Snapshot of the store file taken before the change
    pub backup: Option<PathBuf>,
}

/// Read and validate a portable file and diff it against the store
pub fn plan_file_import(store: &Store, path: &Path) -> Result<FileImportPreview> {
    let incoming = Store::load(path)?;
    let index = key_index(store);
    let forest = Forest::from_store(&incoming);

    let mut to_add = Vec::new();
    let mut skipped = 0;
    let mut conflicts = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (key, node) in forest.url_entries() {
        if !seen.insert(key.clone()) {
            continue;
        }
        match index.get(&key).and_then(|id| store.get(*id)) {
            None => to_add.push((key.path, node.clone())),
            Some(existing) if existing.title == node.title => skipped += 1,
            Some(existing) => conflicts.push(Conflict {
                browser: None,
                path: key.path,
                url: node.url.clone(),
                existing: existing.id,
                existing_title: existing.title.clone(),
                incoming: node.clone(),
            }),
        }
    }

    Ok(FileImportPreview {
        incoming,
        to_add,
        skipped,
        conflicts,
    })
}

/// Apply a previewed portable import
///
/// The canonical store file is snapshotted first in either mode.
pub fn execute_file_import(
    handle: &StoreHandle,
    preview: FileImportPreview,
    mode: FileImportMode,
    resolution: Resolution,
    backups: &BackupManager,
) -> Result<FileImportOutcome> {
    let mut store = handle.lock();

    // 1. Snapshot the current store file
    let backup = backups.snapshot("store", handle.path())?;

    // 2. Build the replacement in memory
    let mut outcome = FileImportOutcome {
        backup,
        ..Default::default()
    };
    let next = match mode {
        FileImportMode::Overwrite => {
            outcome.added = preview.incoming.url_count();
            preview.incoming
        }
        FileImportMode::Merge => {
            let mut next = store.clone();
            for (path, node) in &preview.to_add {
                let (parent, _) = next.ensure_folder_path(path)?;
                next.insert(parent, incoming_copy(node, None), None)?;
                outcome.added += 1;
            }
            for conflict in &preview.conflicts {
                if apply_resolution(&mut next, conflict, resolution)? {
                    outcome.resolved += 1;
                }
            }
            next
        }
    };

    // 3. Persist, then swap in
    handle.save_locked(&next)?;
    *store = next;

    info!(
        "Loaded portable file ({:?}): {} added, {} resolved",
        mode, outcome.added, outcome.resolved
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use marksync_core::RootKind;
    use tempfile::TempDir;

    fn store_with(entries: &[(&str, &str)]) -> Store {
        let mut store = Store::new();
        let bar = store.root_id(RootKind::BookmarkBar);
        for (title, url) in entries {
            store.insert(bar, Node::url(*title, *url), None).unwrap();
        }
        store
    }

    struct Fixture {
        temp_dir: TempDir,
        handle: StoreHandle,
        backups: BackupManager,
        file: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let store_path = temp_dir.path().join("bookmarks.json");
        store_with(&[("A", "https://a.org"), ("B", "https://b.org")])
            .save(&store_path)
            .unwrap();

        let file = temp_dir.path().join("export.json");
        export_store(
            &store_with(&[("A", "https://a.org/"), ("B renamed", "https://b.org"), ("C", "https://c.org")]),
            &file,
        )
        .unwrap();

        Fixture {
            handle: StoreHandle::open(&store_path).unwrap(),
            backups: BackupManager::new(temp_dir.path().join("backups"), 5),
            file,
            temp_dir,
        }
    }

    #[test]
    fn test_preview_classifies_entries() {
        let f = fixture();
        let preview = plan_file_import(&f.handle.lock(), &f.file).unwrap();
        assert_eq!(preview.to_add.len(), 1);
        assert_eq!(preview.to_add[0].1.title, "C");
        assert_eq!(preview.skipped, 1);
        assert_eq!(preview.conflicts.len(), 1);
        assert_eq!(preview.conflicts[0].existing_title, "B");
    }

    #[test]
    fn test_merge_keeps_existing_by_default() {
        let f = fixture();
        let preview = plan_file_import(&f.handle.lock(), &f.file).unwrap();
        let outcome = execute_file_import(
            &f.handle,
            preview,
            FileImportMode::Merge,
            Resolution::KeepExisting,
            &f.backups,
        )
        .unwrap();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.resolved, 0);
        assert!(outcome.backup.unwrap().exists());

        let saved = Store::load(f.handle.path()).unwrap();
        assert_eq!(saved.url_count(), 3);
        assert!(saved.find(|n| n.title == "B").next().is_some());
    }

    #[test]
    fn test_merge_with_incoming_titles() {
        let f = fixture();
        let preview = plan_file_import(&f.handle.lock(), &f.file).unwrap();
        let outcome = execute_file_import(
            &f.handle,
            preview,
            FileImportMode::Merge,
            Resolution::UseIncoming,
            &f.backups,
        )
        .unwrap();
        assert_eq!(outcome.resolved, 1);
        assert!(f.handle.lock().find(|n| n.title == "B renamed").next().is_some());
    }

    #[test]
    fn test_overwrite_replaces_store() {
        let f = fixture();
        let original = std::fs::read(f.handle.path()).unwrap();
        let preview = plan_file_import(&f.handle.lock(), &f.file).unwrap();
        let outcome = execute_file_import(
            &f.handle,
            preview,
            FileImportMode::Overwrite,
            Resolution::KeepExisting,
            &f.backups,
        )
        .unwrap();

        assert_eq!(outcome.added, 3);
        let titles: Vec<String> = f.handle.lock().find(|n| n.is_url()).map(|n| n.title.clone()).collect();
        assert_eq!(titles, vec!["A", "B renamed", "C"]);
        assert_eq!(std::fs::read(outcome.backup.unwrap()).unwrap(), original);
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let f = fixture();
        let bad = f.temp_dir.path().join("bad.json");
        std::fs::write(&bad, br#"{"version": 1, "roots": {}}"#).unwrap();
        assert!(plan_file_import(&f.handle.lock(), &bad).is_err());
    }
}
