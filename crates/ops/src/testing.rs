//! Fixtures shared by the orchestrator tests

use marksync_codec::{BookmarkCodec, Codec};
use marksync_core::{Browser, Config, Error, Forest, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn codec_for(browser: Browser, path: &Path) -> Arc<dyn BookmarkCodec> {
    Arc::new(Codec::new(
        browser,
        path.to_path_buf(),
        Arc::new(|_: Browser| false),
        &Config::default(),
    ))
}

pub fn running_codec(browser: Browser, path: &Path) -> Arc<dyn BookmarkCodec> {
    Arc::new(Codec::new(
        browser,
        path.to_path_buf(),
        Arc::new(|_: Browser| true),
        &Config::default(),
    ))
}

/// Write `forest` as the browser would have it on disk
pub fn write_browser_file(browser: Browser, path: &Path, forest: &Forest) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    codec_for(browser, path).write(forest).unwrap();
}

/// Codec whose write scribbles over the target and then fails
pub struct FailingCodec {
    pub path: PathBuf,
}

impl BookmarkCodec for FailingCodec {
    fn browser(&self) -> Browser {
        Browser::Chrome
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn detect_running(&self) -> bool {
        false
    }

    fn read(&self) -> Result<Forest> {
        Ok(Forest::default())
    }

    fn write(&self, _forest: &Forest) -> Result<()> {
        std::fs::write(&self.path, b"{\"roots\": {\"bookmark_b").map_err(Error::Io)?;
        Err(Error::Io(std::io::Error::other("disk full")))
    }
}
