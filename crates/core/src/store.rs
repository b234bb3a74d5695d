//! The canonical bookmark store
//!
//! Nodes live in an arena keyed by UUID; each slot holds the node's own
//! fields plus the ordered ids of its children. The arena doubles as the
//! id → node index, so lookups, parent resolution and moves are O(1) and the
//! tree shape is only materialized when a nested form is needed (documents,
//! forests, deleted subtrees).
//!
//! On disk the store is a single JSON document:
//! ```text
//! {
//!   "version": 1,
//!   "last_modified": "...",
//!   "roots": { "bookmark_bar": {..folder..}, "other": {..folder..} }
//! }
//! ```

use crate::error::{Error, Result};
use crate::fs::atomic_write;
use crate::key::{DedupKey, FolderPath};
use crate::node::{Browser, Node, NodeKind, RootKind};
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};
use uuid::Uuid;

pub const STORE_VERSION: u32 = 1;

/// Serialized form of the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    #[serde(with = "crate::timestamp")]
    pub last_modified: DateTime<Utc>,
    pub roots: DocumentRoots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRoots {
    pub bookmark_bar: Node,
    pub other: Node,
}

/// Field changes applied by [`Store::update`]
///
/// `date_modified` overrides the "now" stamp; sync uses it to carry a
/// browser's newer timestamp into the store.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub title: Option<String>,
    pub url: Option<String>,
    pub preferred_browser: Option<Option<Browser>>,
    pub date_modified: Option<DateTime<Utc>>,
}

impl NodeUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    /// Node fields; `node.children` stays empty inside the arena
    node: Node,
    children: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct Store {
    version: u32,
    last_modified: DateTime<Utc>,
    bookmark_bar: Uuid,
    other: Uuid,
    slots: HashMap<Uuid, Slot>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Empty store with both roots
    pub fn new() -> Self {
        let bar = Node::folder(RootKind::BookmarkBar.title());
        let other = Node::folder(RootKind::Other.title());
        let (bar_id, other_id) = (bar.id, other.id);

        let mut slots = HashMap::new();
        slots.insert(bar_id, Slot { node: bar, children: Vec::new() });
        slots.insert(other_id, Slot { node: other, children: Vec::new() });

        Self {
            version: STORE_VERSION,
            last_modified: timestamp::now(),
            bookmark_bar: bar_id,
            other: other_id,
            slots,
        }
    }

    /// Load and validate a store file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| Error::io_at(path, e))?;
        let doc: StoreDocument = serde_json::from_slice(&bytes)
            .map_err(|e| Error::validation(format!("{}: {}", path.display(), e)))?;
        let store = Self::from_document(doc)?;
        info!("Loaded store from {} ({} nodes)", path.display(), store.len());
        Ok(store)
    }

    /// Load the store at `path`, or start an empty one if none exists yet
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No store at {}, starting empty", path.display());
            Ok(Self::new())
        }
    }

    /// Persist atomically
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_json()?;
        atomic_write(path, &bytes)?;
        debug!("Saved store to {} ({} nodes)", path.display(), self.len());
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_document())
            .map_err(|e| Error::validation(format!("serialize store: {e}")))
    }

    /// Build a store from a document, rejecting anything structurally wrong
    pub fn from_document(doc: StoreDocument) -> Result<Self> {
        if doc.version != STORE_VERSION {
            return Err(Error::validation(format!(
                "unsupported store version {} (expected {})",
                doc.version, STORE_VERSION
            )));
        }

        let mut store = Self {
            version: doc.version,
            last_modified: doc.last_modified,
            bookmark_bar: doc.roots.bookmark_bar.id,
            other: doc.roots.other.id,
            slots: HashMap::new(),
        };

        for (kind, root) in [
            (RootKind::BookmarkBar, doc.roots.bookmark_bar),
            (RootKind::Other, doc.roots.other),
        ] {
            if !root.is_folder() {
                return Err(Error::validation(format!("root {kind} is not a folder")));
            }
            if root.parent_id.is_some() {
                return Err(Error::validation(format!("root {kind} has a parent")));
            }
            store.absorb(root, None, 0, true)?;
        }

        Ok(store)
    }

    pub fn to_document(&self) -> StoreDocument {
        StoreDocument {
            version: self.version,
            last_modified: self.last_modified,
            roots: DocumentRoots {
                bookmark_bar: self.materialize_root(RootKind::BookmarkBar),
                other: self.materialize_root(RootKind::Other),
            },
        }
    }

    /// Index a nested subtree into the arena
    ///
    /// With `strict`, stored parent links and positions must already agree
    /// with the tree shape (loading). Otherwise they are assigned (inserting).
    fn absorb(&mut self, mut node: Node, parent: Option<Uuid>, position: usize, strict: bool) -> Result<Uuid> {
        let id = node.id;
        if self.slots.contains_key(&id) {
            return Err(Error::validation(format!("duplicate node id {id}")));
        }
        match node.kind {
            NodeKind::Url if node.url.is_empty() => {
                return Err(Error::validation(format!("url node {id} ('{}') has no url", node.title)));
            }
            NodeKind::Url if !node.children.is_empty() => {
                return Err(Error::validation(format!("url node {id} ('{}') has children", node.title)));
            }
            NodeKind::Folder if !node.url.is_empty() => {
                return Err(Error::validation(format!("folder {id} ('{}') carries a url", node.title)));
            }
            _ => {}
        }

        if strict {
            if node.parent_id != parent {
                return Err(Error::validation(format!(
                    "node {id} claims parent {:?} but sits under {:?}",
                    node.parent_id, parent
                )));
            }
            if node.position != position {
                return Err(Error::validation(format!(
                    "node {id} claims position {} but sits at {}",
                    node.position, position
                )));
            }
        } else {
            node.parent_id = parent;
            node.position = position;
        }

        let children = std::mem::take(&mut node.children);
        // Reserve the slot first so cycles through duplicate ids are caught
        self.slots.insert(id, Slot { node, children: Vec::with_capacity(children.len()) });

        let mut child_ids = Vec::with_capacity(children.len());
        for (i, child) in children.into_iter().enumerate() {
            child_ids.push(self.absorb(child, Some(id), i, strict)?);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.children = child_ids;
        }
        Ok(id)
    }

    fn materialize(&self, id: Uuid) -> Option<Node> {
        let slot = self.slots.get(&id)?;
        let mut node = slot.node.clone();
        node.children = slot.children.iter().filter_map(|c| self.materialize(*c)).collect();
        Some(node)
    }

    fn materialize_root(&self, root: RootKind) -> Node {
        self.materialize(self.root_id(root))
            .unwrap_or_else(|| Node::folder(root.title()))
    }

    // ---- Accessors ----

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    pub fn root_id(&self, root: RootKind) -> Uuid {
        match root {
            RootKind::BookmarkBar => self.bookmark_bar,
            RootKind::Other => self.other,
        }
    }

    pub fn is_root(&self, id: Uuid) -> bool {
        id == self.bookmark_bar || id == self.other
    }

    /// Node by id; the returned node has no nested children
    pub fn get(&self, id: Uuid) -> Option<&Node> {
        self.slots.get(&id).map(|s| &s.node)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.slots.contains_key(&id)
    }

    /// Ordered child ids of a folder (empty for urls and unknown ids)
    pub fn children(&self, id: Uuid) -> &[Uuid] {
        self.slots.get(&id).map(|s| s.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_nodes(&self, id: Uuid) -> impl Iterator<Item = &Node> + '_ {
        self.children(id).iter().filter_map(move |c| self.get(*c))
    }

    /// Nested copy of the subtree rooted at `id`
    pub fn subtree(&self, id: Uuid) -> Option<Node> {
        self.materialize(id)
    }

    /// Number of nodes, roots excluded
    pub fn len(&self) -> usize {
        self.slots.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn url_count(&self) -> usize {
        self.slots.values().filter(|s| s.node.is_url()).count()
    }

    /// Lazy depth-first search over every non-root node, bookmark bar first
    pub fn find<P>(&self, predicate: P) -> Find<'_, P>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut stack: Vec<Uuid> = Vec::new();
        stack.extend(self.children(self.other).iter().rev());
        stack.extend(self.children(self.bookmark_bar).iter().rev());
        Find {
            store: self,
            stack,
            predicate,
        }
    }

    /// Which root a node ultimately hangs from
    pub fn root_of(&self, id: Uuid) -> Option<RootKind> {
        let mut cur = id;
        loop {
            if cur == self.bookmark_bar {
                return Some(RootKind::BookmarkBar);
            }
            if cur == self.other {
                return Some(RootKind::Other);
            }
            cur = self.get(cur)?.parent_id?;
        }
    }

    /// Path of a folder, from its root down to and including itself
    pub fn folder_path(&self, folder: Uuid) -> Option<FolderPath> {
        let mut segments = Vec::new();
        let mut cur = folder;
        loop {
            if cur == self.bookmark_bar || cur == self.other {
                let root = if cur == self.bookmark_bar {
                    RootKind::BookmarkBar
                } else {
                    RootKind::Other
                };
                segments.reverse();
                return Some(FolderPath { root, segments });
            }
            let node = self.get(cur)?;
            segments.push(node.title.clone());
            cur = node.parent_id?;
        }
    }

    /// First child folder of `parent` with the given title
    pub fn child_folder(&self, parent: Uuid, title: &str) -> Option<Uuid> {
        self.child_nodes(parent)
            .find(|n| n.is_folder() && n.title == title)
            .map(|n| n.id)
    }

    /// Folder addressed by `path`, if every segment exists
    pub fn resolve_folder_path(&self, path: &FolderPath) -> Option<Uuid> {
        let mut cur = self.root_id(path.root);
        for seg in &path.segments {
            cur = self.child_folder(cur, seg)?;
        }
        Some(cur)
    }

    /// Find-or-create the folders along `path`
    ///
    /// Returns the folder id and how many folders had to be created.
    pub fn ensure_folder_path(&mut self, path: &FolderPath) -> Result<(Uuid, usize)> {
        let mut cur = self.root_id(path.root);
        let mut created = 0;
        for seg in &path.segments {
            cur = match self.child_folder(cur, seg) {
                Some(id) => id,
                None => {
                    created += 1;
                    self.insert(cur, Node::folder(seg.clone()), None)?
                }
            };
        }
        Ok((cur, created))
    }

    /// Dedup key of every url node, in depth-first order
    pub fn url_entries(&self) -> Vec<(DedupKey, Uuid)> {
        let mut out = Vec::new();
        for root in RootKind::ALL {
            self.collect_keys(self.root_id(root), &FolderPath::root(root), &mut out);
        }
        out
    }

    fn collect_keys(&self, folder: Uuid, path: &FolderPath, out: &mut Vec<(DedupKey, Uuid)>) {
        for child in self.child_nodes(folder) {
            match child.kind {
                NodeKind::Url => out.push((DedupKey::new(&child.url, path.clone()), child.id)),
                NodeKind::Folder => self.collect_keys(child.id, &path.child(&child.title), out),
            }
        }
    }

    // ---- Mutations ----

    /// Insert a node (and any nested children) under `parent`
    ///
    /// `position` defaults to appending and is clamped to the child count.
    /// The inserted nodes keep their own timestamps; the parent folder and
    /// the store are stamped as modified.
    pub fn insert(&mut self, parent: Uuid, node: Node, position: Option<usize>) -> Result<Uuid> {
        match self.get(parent) {
            Some(p) if p.is_folder() => {}
            Some(_) => {
                return Err(Error::validation(format!("parent {parent} is not a folder")));
            }
            None => return Err(Error::ParentNotFound(parent)),
        }

        // Validate the whole subtree before touching the arena
        node.check_shape()?;
        self.check_ids_free(&node)?;

        let len = self.children(parent).len();
        let at = position.map_or(len, |p| p.min(len));
        let id = self.absorb(node, Some(parent), at, false)?;

        if let Some(slot) = self.slots.get_mut(&parent) {
            slot.children.insert(at, id);
        }
        self.renumber(parent);

        let now = timestamp::now();
        self.touch(parent, now);
        self.last_modified = now;
        Ok(id)
    }

    /// Every id in the subtree must be new to the store and unique within it
    fn check_ids_free(&self, node: &Node) -> Result<()> {
        let mut seen = HashSet::new();
        let mut pending = vec![node];
        while let Some(cur) = pending.pop() {
            if self.slots.contains_key(&cur.id) {
                return Err(Error::validation(format!("node id {} already in store", cur.id)));
            }
            if !seen.insert(cur.id) {
                return Err(Error::validation(format!("node id {} repeated in subtree", cur.id)));
            }
            pending.extend(&cur.children);
        }
        Ok(())
    }

    /// Move a node under `new_parent` at `position` (clamped; default append)
    pub fn move_node(&mut self, id: Uuid, new_parent: Uuid, position: Option<usize>) -> Result<()> {
        if self.is_root(id) {
            return Err(Error::InvalidMove("roots cannot be moved".into()));
        }
        let old_parent = self
            .get(id)
            .ok_or(Error::NodeNotFound(id))?
            .parent_id
            .ok_or_else(|| Error::validation(format!("node {id} has no parent")))?;
        match self.get(new_parent) {
            Some(p) if p.is_folder() => {}
            Some(_) => {
                return Err(Error::validation(format!("parent {new_parent} is not a folder")));
            }
            None => return Err(Error::ParentNotFound(new_parent)),
        }

        // Refuse moving a folder into its own subtree
        let mut cur = Some(new_parent);
        while let Some(c) = cur {
            if c == id {
                return Err(Error::InvalidMove(format!("{id} cannot move into its own subtree")));
            }
            cur = self.get(c).and_then(|n| n.parent_id);
        }

        if let Some(slot) = self.slots.get_mut(&old_parent) {
            slot.children.retain(|c| *c != id);
        }
        let len = self.children(new_parent).len();
        let at = position.map_or(len, |p| p.min(len));
        if let Some(slot) = self.slots.get_mut(&new_parent) {
            slot.children.insert(at, id);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.node.parent_id = Some(new_parent);
        }
        self.renumber(old_parent);
        if old_parent != new_parent {
            self.renumber(new_parent);
        }

        let now = timestamp::now();
        self.touch(id, now);
        self.touch(old_parent, now);
        self.touch(new_parent, now);
        self.last_modified = now;
        Ok(())
    }

    pub fn update(&mut self, id: Uuid, update: NodeUpdate) -> Result<()> {
        let slot = self.slots.get_mut(&id).ok_or(Error::NodeNotFound(id))?;
        let node = &mut slot.node;

        if let Some(url) = update.url {
            match node.kind {
                NodeKind::Folder if !url.is_empty() => {
                    return Err(Error::validation(format!("folder {id} cannot take a url")));
                }
                NodeKind::Url if url.is_empty() => {
                    return Err(Error::validation(format!("url node {id} needs a url")));
                }
                _ => node.url = url,
            }
        }
        if let Some(title) = update.title {
            node.title = title;
        }
        if let Some(preferred) = update.preferred_browser {
            node.preferred_browser = preferred;
        }

        let now = timestamp::now();
        node.date_modified = update.date_modified.unwrap_or(now);
        self.last_modified = now;
        Ok(())
    }

    /// Remove a node and everything beneath it, returning the removed subtree
    pub fn delete(&mut self, id: Uuid) -> Result<Node> {
        if self.is_root(id) {
            return Err(Error::InvalidMove("roots cannot be deleted".into()));
        }
        let removed = self.subtree(id).ok_or(Error::NodeNotFound(id))?;
        let parent = removed.parent_id;

        let mut pending = vec![id];
        while let Some(cur) = pending.pop() {
            if let Some(slot) = self.slots.remove(&cur) {
                pending.extend(slot.children);
            }
        }

        let now = timestamp::now();
        if let Some(parent) = parent {
            if let Some(slot) = self.slots.get_mut(&parent) {
                slot.children.retain(|c| *c != id);
            }
            self.renumber(parent);
            self.touch(parent, now);
        }
        self.last_modified = now;
        debug!("Deleted {} node(s) starting at {}", removed.count(), id);
        Ok(removed)
    }

    fn renumber(&mut self, parent: Uuid) {
        let children = self.children(parent).to_vec();
        for (i, c) in children.into_iter().enumerate() {
            if let Some(slot) = self.slots.get_mut(&c) {
                slot.node.position = i;
            }
        }
    }

    fn touch(&mut self, id: Uuid, now: DateTime<Utc>) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.node.date_modified = now;
        }
    }
}

/// Iterator returned by [`Store::find`]
pub struct Find<'a, P> {
    store: &'a Store,
    stack: Vec<Uuid>,
    predicate: P,
}

impl<'a, P> Iterator for Find<'a, P>
where
    P: FnMut(&Node) -> bool,
{
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(slot) = self.store.slots.get(&id) else {
                continue;
            };
            self.stack.extend(slot.children.iter().rev());
            if (self.predicate)(&slot.node) {
                return Some(&slot.node);
            }
        }
        None
    }
}
