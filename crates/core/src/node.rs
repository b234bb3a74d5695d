//! Bookmark nodes and the identifiers that classify them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Supported browsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    Chrome,
    Edge,
    Firefox,
}

/// On-disk format family a browser belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    /// JSON `Bookmarks` file with an MD5 checksum
    Chromium,
    /// `places.sqlite` database
    Firefox,
}

impl Browser {
    pub const ALL: [Browser; 3] = [Browser::Chrome, Browser::Edge, Browser::Firefox];

    pub fn family(self) -> BrowserFamily {
        match self {
            Browser::Chrome | Browser::Edge => BrowserFamily::Chromium,
            Browser::Firefox => BrowserFamily::Firefox,
        }
    }

    /// Executable names the liveness guard looks for
    pub fn process_names(self) -> &'static [&'static str] {
        match self {
            Browser::Chrome => &["chrome", "google-chrome", "google-chrome-stable", "chrome.exe"],
            Browser::Edge => &["msedge", "microsoft-edge", "microsoft-edge-stable", "msedge.exe"],
            Browser::Firefox => &["firefox", "firefox.exe", "firefox-esr"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Edge => "edge",
            Browser::Firefox => "firefox",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Browser::Chrome => "Google Chrome",
            Browser::Edge => "Microsoft Edge",
            Browser::Firefox => "Mozilla Firefox",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" | "google-chrome" => Ok(Browser::Chrome),
            "edge" | "msedge" => Ok(Browser::Edge),
            "firefox" => Ok(Browser::Firefox),
            other => Err(format!("unknown browser '{other}' (expected chrome, edge or firefox)")),
        }
    }
}

/// Node discriminator, serialized as `"type"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Url,
    Folder,
}

/// The two permanent top-level folders of the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootKind {
    BookmarkBar,
    Other,
}

impl RootKind {
    pub const ALL: [RootKind; 2] = [RootKind::BookmarkBar, RootKind::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            RootKind::BookmarkBar => "bookmark_bar",
            RootKind::Other => "other",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RootKind::BookmarkBar => "Bookmarks Bar",
            RootKind::Other => "Other Bookmarks",
        }
    }
}

impl fmt::Display for RootKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RootKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bookmark_bar" => Ok(RootKind::BookmarkBar),
            "other" => Ok(RootKind::Other),
            other => Err(format!("unknown root '{other}'")),
        }
    }
}

/// A bookmark or folder
///
/// Inside the [`Store`](crate::Store) arena `children` is always empty and the
/// tree shape lives in the arena's child lists; nested trees are materialized
/// for documents, forests and codecs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub title: String,
    /// Empty for folders
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub position: usize,
    #[serde(with = "crate::timestamp")]
    pub date_added: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub date_modified: DateTime<Utc>,
    #[serde(default)]
    pub preferred_browser: Option<Browser>,
    #[serde(default)]
    pub source_browser: Option<Browser>,
    /// Identifier of the node inside the browser it came from
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self::fresh(NodeKind::Url, title.into(), url.into())
    }

    pub fn folder(title: impl Into<String>) -> Self {
        Self::fresh(NodeKind::Folder, title.into(), String::new())
    }

    fn fresh(kind: NodeKind, title: String, url: String) -> Self {
        let now = crate::timestamp::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            title,
            url,
            parent_id: None,
            position: 0,
            date_added: now,
            date_modified: now,
            preferred_browser: None,
            source_browser: None,
            source_id: None,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn with_dates(mut self, added: DateTime<Utc>, modified: DateTime<Utc>) -> Self {
        self.date_added = added;
        self.date_modified = modified;
        self
    }

    pub fn with_source(mut self, browser: Browser, source_id: impl Into<String>) -> Self {
        self.source_browser = Some(browser);
        self.source_id = Some(source_id.into());
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_url(&self) -> bool {
        self.kind == NodeKind::Url
    }

    /// Number of nodes in this subtree, including `self`
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Copy of this subtree with fresh ids and consistent parent links
    ///
    /// Used when content crosses into the store from a browser or a file,
    /// so foreign ids never collide with the arena's.
    pub fn reidentified(&self, parent_id: Option<Uuid>) -> Node {
        let id = Uuid::new_v4();
        let children = self
            .children
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let mut c = c.reidentified(Some(id));
                c.position = i;
                c
            })
            .collect();
        Node {
            id,
            parent_id,
            children,
            ..self.clone()
        }
    }

    /// Check the per-node shape rules, recursively
    pub fn check_shape(&self) -> crate::Result<()> {
        match self.kind {
            NodeKind::Url => {
                if self.url.is_empty() {
                    return Err(crate::Error::validation(format!(
                        "url node {} ('{}') has no url",
                        self.id, self.title
                    )));
                }
                if !self.children.is_empty() {
                    return Err(crate::Error::validation(format!(
                        "url node {} ('{}') has children",
                        self.id, self.title
                    )));
                }
            }
            NodeKind::Folder => {
                if !self.url.is_empty() {
                    return Err(crate::Error::validation(format!(
                        "folder {} ('{}') carries a url",
                        self.id, self.title
                    )));
                }
                for child in &self.children {
                    child.check_shape()?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_parse_and_display() {
        for browser in Browser::ALL {
            assert_eq!(browser.to_string().parse::<Browser>().unwrap(), browser);
        }
        assert_eq!("Chrome".parse::<Browser>().unwrap(), Browser::Chrome);
        assert!("safari".parse::<Browser>().is_err());
        assert_eq!(Browser::Edge.family(), BrowserFamily::Chromium);
        assert_eq!(Browser::Firefox.family(), BrowserFamily::Firefox);
    }

    #[test]
    fn test_node_serializes_kind_as_type() {
        let node = Node::url("Rust", "https://rust-lang.org");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "url");
        assert!(json.get("children").is_none());

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_shape_rules() {
        let mut bad = Node::url("x", "");
        assert!(bad.check_shape().is_err());
        bad.url = "https://x.org".into();
        bad.children.push(Node::folder("f"));
        assert!(bad.check_shape().is_err());

        let mut folder = Node::folder("f");
        folder.url = "https://x.org".into();
        assert!(folder.check_shape().is_err());

        let good = Node::folder("f").with_children(vec![Node::url("a", "https://a.org")]);
        assert!(good.check_shape().is_ok());
        assert_eq!(good.count(), 2);
    }

    #[test]
    fn test_reidentified_links_children() {
        let tree = Node::folder("Dev").with_children(vec![
            Node::url("a", "https://a.org"),
            Node::folder("Sub").with_children(vec![Node::url("b", "https://b.org")]),
        ]);
        let copy = tree.reidentified(None);
        assert_ne!(copy.id, tree.id);
        assert_eq!(copy.children[1].parent_id, Some(copy.id));
        assert_eq!(copy.children[1].position, 1);
        assert_eq!(copy.children[1].children[0].parent_id, Some(copy.children[1].id));
        assert_eq!(copy.children[1].children[0].url, "https://b.org");
    }
}
