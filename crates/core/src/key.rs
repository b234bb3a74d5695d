//! Dedup keys: normalized URL plus the folder path a bookmark lives under
//!
//! Two bookmarks are "the same" for import and sync when their keys are
//! equal. Titles do not participate; a title difference on an equal key is a
//! conflict (import) or an update candidate (sync).

use crate::node::RootKind;
use std::fmt;
use url::Url;

/// Normalize a URL for comparison
///
/// Lowercases scheme and host and strips trailing `/` from the path. Query
/// and fragment are kept. Inputs the URL parser rejects, or that carry no
/// host, compare after trailing-slash trimming only.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(u) if u.host_str().is_some() => u,
        _ => return trimmed.trim_end_matches('/').to_string(),
    };

    let mut out = String::with_capacity(trimmed.len());
    out.push_str(parsed.scheme());
    out.push_str("://");
    if !parsed.username().is_empty() {
        out.push_str(parsed.username());
        if let Some(pw) = parsed.password() {
            out.push(':');
            out.push_str(pw);
        }
        out.push('@');
    }
    // host_str is already lowercased by the parser
    out.push_str(parsed.host_str().unwrap_or_default());
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(parsed.path().trim_end_matches('/'));
    if let Some(q) = parsed.query() {
        out.push('?');
        out.push_str(q);
    }
    if let Some(f) = parsed.fragment() {
        out.push('#');
        out.push_str(f);
    }
    out
}

/// Root plus folder titles from the root down, e.g. `bookmark_bar/Dev/Sub`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderPath {
    pub root: RootKind,
    pub segments: Vec<String>,
}

impl FolderPath {
    pub fn root(root: RootKind) -> Self {
        Self {
            root,
            segments: Vec::new(),
        }
    }

    pub fn child(&self, title: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(title.to_string());
        Self {
            root: self.root,
            segments,
        }
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root.as_str())?;
        for seg in &self.segments {
            write!(f, "/{seg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub url: String,
    pub path: FolderPath,
}

impl DedupKey {
    pub fn new(url: &str, path: FolderPath) -> Self {
        Self {
            url: normalize_url(url),
            path,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.url, self.path)
    }
}
