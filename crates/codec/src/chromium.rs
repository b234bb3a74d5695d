//! Chromium-family codec (Chrome, Edge)
//!
//! Both browsers share one JSON `Bookmarks` schema and differ only in where
//! the file lives and which process owns it.

use crate::checksum;
use crate::guard::LivenessCheck;
use crate::time::{from_chrome, to_chrome};
use crate::BookmarkCodec;
use marksync_core::fs::atomic_write;
use marksync_core::{timestamp, Browser, Error, Forest, Node, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fixed GUIDs Chromium assigns to its permanent folders
const ROOT_GUIDS: [&str; 3] = [
    "0bc5d13f-2cba-5d74-951f-3f233fe6c908",
    "82b081ec-3dd3-529c-8475-ab6c344590dd",
    "4cf2e351-0e85-532b-bb37-df045d8f8d0f",
];

/// Top-level `Bookmarks` document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarksFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub roots: Roots,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roots {
    pub bookmark_bar: WireNode,
    pub other: WireNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced: Option<WireNode>,
}

/// One node as Chromium serializes it (keys in Chromium's own order)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<WireNode>>,
    #[serde(default)]
    pub date_added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_last_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub guid: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

pub struct ChromiumCodec {
    browser: Browser,
    path: PathBuf,
    liveness: Arc<dyn LivenessCheck>,
    verify_checksum: bool,
}

impl ChromiumCodec {
    pub fn new(browser: Browser, path: impl Into<PathBuf>, liveness: Arc<dyn LivenessCheck>) -> Self {
        Self {
            browser,
            path: path.into(),
            liveness,
            verify_checksum: true,
        }
    }

    /// Whether `read` rejects files whose stored checksum disagrees
    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    /// Parse raw `Bookmarks` JSON into a forest
    pub fn decode(&self, bytes: &[u8]) -> Result<Forest> {
        let file: BookmarksFile = serde_json::from_slice(bytes).map_err(|e| {
            Error::validation(format!("{} bookmarks at {}: {}", self.browser, self.path.display(), e))
        })?;

        if self.verify_checksum {
            if let Some(expected) = file.checksum.as_deref().filter(|c| !c.is_empty()) {
                let computed = checksum::compute(&file.roots);
                if !expected.eq_ignore_ascii_case(&computed) {
                    return Err(Error::ChecksumMismatch {
                        expected: expected.to_string(),
                        computed,
                    });
                }
            }
        }

        let mut forest = Forest {
            bookmark_bar: self.decode_children(&file.roots.bookmark_bar, None)?,
            other: self.decode_children(&file.roots.other, None)?,
            synced: Vec::new(),
        };
        if let Some(synced) = &file.roots.synced {
            forest.other.extend(self.decode_children(synced, None)?);
        }
        forest.renumber();
        Ok(forest)
    }

    fn decode_children(&self, folder: &WireNode, parent: Option<Uuid>) -> Result<Vec<Node>> {
        folder
            .children
            .iter()
            .flatten()
            .map(|child| self.decode_node(child, parent))
            .collect()
    }

    fn decode_node(&self, wire: &WireNode, parent: Option<Uuid>) -> Result<Node> {
        let mut node = match wire.kind.as_str() {
            "url" => {
                let url = wire.url.as_deref().unwrap_or_default();
                if url.is_empty() {
                    return Err(Error::validation(format!(
                        "{} bookmark {} ('{}') has no url",
                        self.browser, wire.id, wire.name
                    )));
                }
                Node::url(wire.name.clone(), url)
            }
            "folder" => Node::folder(wire.name.clone()),
            other => {
                return Err(Error::validation(format!(
                    "{} node {} has unknown type '{}'",
                    self.browser, wire.id, other
                )));
            }
        };

        let added = from_chrome(&wire.date_added).unwrap_or_else(timestamp::now);
        let modified = wire
            .date_modified
            .as_deref()
            .and_then(from_chrome)
            .unwrap_or(added);
        node = node.with_dates(added, modified).with_source(self.browser, wire.id.clone());
        node.parent_id = parent;
        node.children = self.decode_children(wire, Some(node.id))?;
        Ok(node)
    }

    /// Serialize a forest into a complete `Bookmarks` document, checksum included
    pub fn encode(&self, forest: &Forest) -> BookmarksFile {
        let now = timestamp::now();
        let mut ids = IdAllocator { next: 4 };
        let root = |id: &str, guid: &str, name: &str, children: Vec<WireNode>| WireNode {
            children: Some(children),
            date_added: to_chrome(now),
            date_last_used: Some("0".to_string()),
            date_modified: Some(to_chrome(now)),
            guid: guid.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            kind: "folder".to_string(),
            url: None,
        };

        let bar = forest.bookmark_bar.iter().map(|n| ids.encode(n)).collect();
        let other = forest.other.iter().map(|n| ids.encode(n)).collect();
        let synced = forest.synced.iter().map(|n| ids.encode(n)).collect();

        let roots = Roots {
            bookmark_bar: root("1", ROOT_GUIDS[0], "Bookmarks bar", bar),
            other: root("2", ROOT_GUIDS[1], "Other bookmarks", other),
            synced: Some(root("3", ROOT_GUIDS[2], "Mobile bookmarks", synced)),
        };
        let checksum = checksum::compute(&roots);
        BookmarksFile {
            checksum: Some(checksum),
            roots,
            version: 1,
        }
    }
}

/// Sequential ids in depth-first order after the three fixed root ids
struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    fn encode(&mut self, node: &Node) -> WireNode {
        let id = self.next.to_string();
        self.next += 1;

        let mut wire = WireNode {
            children: None,
            date_added: to_chrome(node.date_added),
            date_last_used: Some("0".to_string()),
            date_modified: Some(to_chrome(node.date_modified)),
            guid: Uuid::new_v4().to_string(),
            id,
            name: node.title.clone(),
            kind: if node.is_folder() { "folder" } else { "url" }.to_string(),
            url: None,
        };
        if node.is_folder() {
            wire.children = Some(node.children.iter().map(|c| self.encode(c)).collect());
        } else {
            wire.url = Some(node.url.clone());
        }
        wire
    }
}

/// Chromium writes its JSON with three-space indentation
fn to_chromium_json(file: &BookmarksFile) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"   ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    file.serialize(&mut ser)
        .map_err(|e| Error::validation(format!("serialize bookmarks: {e}")))?;
    Ok(buf)
}

impl BookmarkCodec for ChromiumCodec {
    fn browser(&self) -> Browser {
        self.browser
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn detect_running(&self) -> bool {
        self.liveness.is_running(self.browser)
    }

    fn read(&self) -> Result<Forest> {
        if !self.path.exists() {
            return Err(Error::BrowserNotFound {
                browser: self.browser,
                path: Some(self.path.clone()),
            });
        }
        let bytes = std::fs::read(&self.path).map_err(|e| Error::io_at(&self.path, e))?;
        let forest = self.decode(&bytes)?;
        info!(
            "Read {} nodes from {} ({})",
            forest.count(),
            self.browser,
            self.path.display()
        );
        Ok(forest)
    }

    fn write(&self, forest: &Forest) -> Result<()> {
        if self.detect_running() {
            warn!("Refusing to write {} bookmarks while it is running", self.browser);
            return Err(Error::BrowserRunning(self.browser));
        }
        let file = self.encode(forest);
        let bytes = to_chromium_json(&file)?;
        atomic_write(&self.path, &bytes)?;
        debug!(
            "Wrote {} nodes to {} (checksum {})",
            forest.count(),
            self.path.display(),
            file.checksum.as_deref().unwrap_or_default()
        );
        Ok(())
    }
}
