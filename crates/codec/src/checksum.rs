//! Chromium `Bookmarks` file checksum
//!
//! A single MD5 digest over the `bookmark_bar`, `other` and `synced` roots in
//! that order, depth-first. Per node it absorbs the id (ASCII), the title
//! (UTF-16LE), then the literal `url` or `folder`; url nodes follow with
//! their URL (ASCII), folders with their children. Chromium recomputes this on
//! load and treats a mismatch as a damaged file, so every write recomputes it.

use crate::chromium::{Roots, WireNode};
use md5::{Digest, Md5};

/// Hex digest of the three roots
pub fn compute(roots: &Roots) -> String {
    let mut hasher = Md5::new();
    absorb(&mut hasher, &roots.bookmark_bar);
    absorb(&mut hasher, &roots.other);
    if let Some(synced) = &roots.synced {
        absorb(&mut hasher, synced);
    }
    hex::encode(hasher.finalize())
}

fn absorb(hasher: &mut Md5, node: &WireNode) {
    hasher.update(node.id.as_bytes());
    for unit in node.name.encode_utf16() {
        hasher.update(unit.to_le_bytes());
    }
    if node.kind == "url" {
        hasher.update(b"url");
        hasher.update(node.url.as_deref().unwrap_or_default().as_bytes());
    } else {
        hasher.update(b"folder");
        for child in node.children.iter().flatten() {
            absorb(hasher, child);
        }
    }
}
