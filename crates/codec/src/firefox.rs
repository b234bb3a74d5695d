//! Firefox codec (`places.sqlite`)
//!
//! Bookmarks live in `moz_bookmarks` (the tree) joined to `moz_places` (the
//! URLs). Folder mapping:
//! - toolbar (3) ↔ `bookmark_bar`
//! - menu (2) and unfiled (5) ↔ `other` on read; writes go to unfiled
//! - tags (4) and mobile (6) are never touched

use crate::guard::LivenessCheck;
use crate::time::{from_firefox, to_firefox};
use crate::BookmarkCodec;
use marksync_core::{timestamp, Browser, Error, Forest, Node, Result};
use rusqlite::{params, Connection, DatabaseName, OpenFlags, OptionalExtension, Transaction};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const TYPE_BOOKMARK: i64 = 1;
const TYPE_FOLDER: i64 = 2;

const MENU_ROOT: i64 = 2;
const TOOLBAR_ROOT: i64 = 3;
const UNFILED_ROOT: i64 = 5;

const SELECT_TREE: &str = "
    SELECT b.id, b.type, b.parent, b.title, b.dateAdded, b.lastModified, p.url
    FROM moz_bookmarks b
    LEFT JOIN moz_places p ON b.fk = p.id
    WHERE b.type IN (1, 2)
    ORDER BY b.parent, b.position";

/// Everything hanging from menu, toolbar and unfiled (separators included)
const DELETE_MAPPED_TREES: &str = "
    WITH RECURSIVE doomed(id) AS (
        SELECT id FROM moz_bookmarks WHERE parent IN (2, 3, 5)
        UNION ALL
        SELECT b.id FROM moz_bookmarks b JOIN doomed d ON b.parent = d.id
    )
    DELETE FROM moz_bookmarks WHERE id IN (SELECT id FROM doomed)";

fn db_err(e: rusqlite::Error) -> Error {
    Error::Database(e.to_string())
}

#[derive(Debug)]
struct Row {
    id: i64,
    kind: i64,
    parent: i64,
    title: Option<String>,
    date_added: Option<i64>,
    last_modified: Option<i64>,
    url: Option<String>,
}

pub struct FirefoxCodec {
    path: PathBuf,
    liveness: Arc<dyn LivenessCheck>,
}

impl FirefoxCodec {
    pub fn new(path: impl Into<PathBuf>, liveness: Arc<dyn LivenessCheck>) -> Self {
        Self {
            path: path.into(),
            liveness,
        }
    }

    /// Copy the live database so reading never contends with Firefox's lock
    fn snapshot(&self, dest: &Path) -> Result<()> {
        let online = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .and_then(|src| src.backup(DatabaseName::Main, dest, None));
        if let Err(e) = online {
            // Firefox holds an exclusive lock while running; fall back to the raw files
            warn!("Online backup of {} failed ({}), copying file", self.path.display(), e);
            std::fs::copy(&self.path, dest).map_err(|e| Error::io_at(&self.path, e))?;
            let wal = wal_path(&self.path);
            if wal.exists() {
                std::fs::copy(&wal, wal_path(dest)).map_err(|e| Error::io_at(&wal, e))?;
            }
        }
        Ok(())
    }

    fn load_rows(conn: &Connection) -> Result<Vec<Row>> {
        let mut stmt = conn.prepare(SELECT_TREE).map_err(db_err)?;
        let rows = stmt
            .query_map([], |r| {
                Ok(Row {
                    id: r.get(0)?,
                    kind: r.get(1)?,
                    parent: r.get(2)?,
                    title: r.get(3)?,
                    date_added: r.get(4)?,
                    last_modified: r.get(5)?,
                    url: r.get(6)?,
                })
            })
            .map_err(db_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn build_forest(rows: Vec<Row>) -> Forest {
        let mut by_parent: HashMap<i64, Vec<Row>> = HashMap::new();
        for row in rows {
            by_parent.entry(row.parent).or_default().push(row);
        }

        let mut seen = HashSet::new();
        let mut build = |root: i64| build_children(&mut by_parent, &mut seen, root, None);
        let bookmark_bar = build(TOOLBAR_ROOT);
        let mut other = build(MENU_ROOT);
        other.extend(build(UNFILED_ROOT));

        let mut forest = Forest {
            bookmark_bar,
            other,
            synced: Vec::new(),
        };
        forest.renumber();
        forest
    }

    fn insert_tree(tx: &Transaction<'_>, node: &Node, parent: i64, position: usize) -> Result<()> {
        let (kind, fk) = if node.is_folder() {
            (TYPE_FOLDER, None)
        } else {
            (TYPE_BOOKMARK, Some(ensure_place(tx, &node.url, &node.title)?))
        };
        tx.execute(
            "INSERT INTO moz_bookmarks (type, fk, parent, position, title, dateAdded, lastModified, guid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                kind,
                fk,
                parent,
                position as i64,
                node.title,
                to_firefox(node.date_added),
                to_firefox(node.date_modified),
                places_guid(),
            ],
        )
        .map_err(db_err)?;
        let id = tx.last_insert_rowid();
        for (i, child) in node.children.iter().enumerate() {
            Self::insert_tree(tx, child, id, i)?;
        }
        Ok(())
    }
}

fn build_children(
    by_parent: &mut HashMap<i64, Vec<Row>>,
    seen: &mut HashSet<i64>,
    parent: i64,
    parent_uuid: Option<Uuid>,
) -> Vec<Node> {
    let Some(rows) = by_parent.remove(&parent) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.id) {
            continue;
        }
        let title = row.title.clone().unwrap_or_default();
        let mut node = match (row.kind, row.url.as_deref()) {
            (TYPE_FOLDER, _) => Node::folder(title),
            (TYPE_BOOKMARK, Some(url)) if !url.is_empty() && !url.starts_with("place:") => Node::url(title, url),
            _ => {
                debug!("Skipping Firefox entry {} (type {}, url {:?})", row.id, row.kind, row.url);
                continue;
            }
        };
        let added = from_firefox(row.date_added).unwrap_or_else(timestamp::now);
        let modified = from_firefox(row.last_modified).unwrap_or(added);
        node = node
            .with_dates(added, modified)
            .with_source(Browser::Firefox, row.id.to_string());
        node.parent_id = parent_uuid;
        if node.is_folder() {
            node.children = build_children(by_parent, seen, row.id, Some(node.id));
        }
        out.push(node);
    }
    out
}

/// Reuse the `moz_places` row for `url`, or create one
fn ensure_place(tx: &Transaction<'_>, url: &str, title: &str) -> Result<i64> {
    let existing: Option<i64> = tx
        .query_row("SELECT id FROM moz_places WHERE url = ?1", [url], |r| r.get(0))
        .optional()
        .map_err(db_err)?;
    if let Some(id) = existing {
        return Ok(id);
    }
    tx.execute(
        "INSERT INTO moz_places (url, title, rev_host, hidden, typed, frecency, guid)
         VALUES (?1, ?2, ?3, 0, 0, -1, ?4)",
        params![url, title, rev_host_for(url), places_guid()],
    )
    .map_err(db_err)?;
    Ok(tx.last_insert_rowid())
}

/// `www.example.com` → `moc.elpmaxe.www.`
pub fn reverse_host(host: &str) -> String {
    let mut rev: String = host.chars().rev().collect();
    rev.push('.');
    rev
}

fn rev_host_for(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(reverse_host))
        .unwrap_or_default()
}

/// Firefox GUIDs: 12 characters of the URL-safe base64 alphabet
fn places_guid() -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    Uuid::new_v4().as_bytes()[..12]
        .iter()
        .map(|b| ALPHABET[(*b & 63) as usize] as char)
        .collect()
}

fn wal_path(db: &Path) -> PathBuf {
    let mut name = db.as_os_str().to_owned();
    name.push("-wal");
    PathBuf::from(name)
}

impl BookmarkCodec for FirefoxCodec {
    fn browser(&self) -> Browser {
        Browser::Firefox
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn detect_running(&self) -> bool {
        self.liveness.is_running(Browser::Firefox)
    }

    fn read(&self) -> Result<Forest> {
        if !self.path.exists() {
            return Err(Error::BrowserNotFound {
                browser: Browser::Firefox,
                path: Some(self.path.clone()),
            });
        }
        let scratch = tempfile::tempdir()?;
        let copy = scratch.path().join("places.sqlite");
        self.snapshot(&copy)?;

        let conn = Connection::open_with_flags(&copy, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(db_err)?;
        let rows = Self::load_rows(&conn)?;
        let forest = Self::build_forest(rows);
        info!("Read {} nodes from firefox ({})", forest.count(), self.path.display());
        Ok(forest)
    }

    fn write(&self, forest: &Forest) -> Result<()> {
        if self.detect_running() {
            warn!("Refusing to write firefox bookmarks while it is running");
            return Err(Error::BrowserRunning(Browser::Firefox));
        }
        if !self.path.exists() {
            return Err(Error::BrowserNotFound {
                browser: Browser::Firefox,
                path: Some(self.path.clone()),
            });
        }

        let mut conn = Connection::open(&self.path).map_err(db_err)?;
        conn.busy_timeout(Duration::from_secs(2)).map_err(db_err)?;
        let tx = conn.transaction().map_err(db_err)?;

        let removed = tx.execute(DELETE_MAPPED_TREES, []).map_err(db_err)?;
        for (i, node) in forest.bookmark_bar.iter().enumerate() {
            Self::insert_tree(&tx, node, TOOLBAR_ROOT, i)?;
        }
        for (i, node) in forest.other.iter().chain(forest.synced.iter()).enumerate() {
            Self::insert_tree(&tx, node, UNFILED_ROOT, i)?;
        }
        tx.execute(
            "UPDATE moz_bookmarks SET lastModified = ?1 WHERE id IN (?2, ?3, ?4)",
            params![to_firefox(timestamp::now()), MENU_ROOT, TOOLBAR_ROOT, UNFILED_ROOT],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        // Fold the log into the main file so a plain copy of it is complete
        let checkpoint = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |r| r.get::<_, i64>(0));
        match checkpoint {
            Ok(0) => {}
            Ok(_) => warn!("Checkpoint of {} was blocked; the log stays in -wal", self.path.display()),
            Err(e) => warn!("Checkpoint of {} failed: {}", self.path.display(), e),
        }

        debug!(
            "Replaced {} firefox rows with {} nodes ({})",
            removed,
            forest.count(),
            self.path.display()
        );
        Ok(())
    }
}
