//! Transient nested bookmark trees, as read from or written to a browser
//!
//! A forest is never persisted by us; it is the shape codecs exchange with
//! the orchestrators. Node ids inside a forest are throwaway.

use crate::key::{DedupKey, FolderPath};
use crate::node::{Node, NodeKind, RootKind};
use crate::store::Store;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forest {
    pub bookmark_bar: Vec<Node>,
    pub other: Vec<Node>,
    /// Chromium's mobile root. Reads fold it into `other`; writes emit it
    /// only when a caller fills it explicitly.
    pub synced: Vec<Node>,
}

impl Forest {
    /// Copy of the store's two roots
    pub fn from_store(store: &Store) -> Self {
        let children_of = |root: RootKind| {
            store
                .subtree(store.root_id(root))
                .map(|n| n.children)
                .unwrap_or_default()
        };
        Self {
            bookmark_bar: children_of(RootKind::BookmarkBar),
            other: children_of(RootKind::Other),
            synced: Vec::new(),
        }
    }

    pub fn root(&self, root: RootKind) -> &[Node] {
        match root {
            RootKind::BookmarkBar => &self.bookmark_bar,
            RootKind::Other => &self.other,
        }
    }

    pub fn root_mut(&mut self, root: RootKind) -> &mut Vec<Node> {
        match root {
            RootKind::BookmarkBar => &mut self.bookmark_bar,
            RootKind::Other => &mut self.other,
        }
    }

    /// Total nodes below the roots
    pub fn count(&self) -> usize {
        [&self.bookmark_bar, &self.other, &self.synced]
            .into_iter()
            .flat_map(|v| v.iter())
            .map(Node::count)
            .sum()
    }

    pub fn url_count(&self) -> usize {
        fn urls(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| if n.is_url() { 1 } else { urls(&n.children) })
                .sum()
        }
        urls(&self.bookmark_bar) + urls(&self.other) + urls(&self.synced)
    }

    /// Dedup key of every url node under the two mapped roots, depth-first
    pub fn url_entries(&self) -> Vec<(DedupKey, &Node)> {
        fn walk<'a>(nodes: &'a [Node], path: &FolderPath, out: &mut Vec<(DedupKey, &'a Node)>) {
            for node in nodes {
                match node.kind {
                    NodeKind::Url => out.push((DedupKey::new(&node.url, path.clone()), node)),
                    NodeKind::Folder => walk(&node.children, &path.child(&node.title), out),
                }
            }
        }
        let mut out = Vec::new();
        for root in RootKind::ALL {
            walk(self.root(root), &FolderPath::root(root), &mut out);
        }
        out
    }

    /// Children list of the folder at `path`, creating folders as needed
    pub fn ensure_folder_mut(&mut self, path: &FolderPath) -> &mut Vec<Node> {
        let mut cur = self.root_mut(path.root);
        for seg in &path.segments {
            let idx = match cur.iter().position(|n| n.is_folder() && &n.title == seg) {
                Some(i) => i,
                None => {
                    cur.push(Node::folder(seg.clone()));
                    cur.len() - 1
                }
            };
            cur = &mut cur[idx].children;
        }
        cur
    }

    /// Reassign sibling positions after edits
    pub fn renumber(&mut self) {
        fn walk(nodes: &mut [Node]) {
            for (i, n) in nodes.iter_mut().enumerate() {
                n.position = i;
                walk(&mut n.children);
            }
        }
        walk(&mut self.bookmark_bar);
        walk(&mut self.other);
        walk(&mut self.synced);
    }
}
