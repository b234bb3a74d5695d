//! Browser bookmark codecs
//!
//! Each supported browser gets a [`BookmarkCodec`] that translates between its
//! native storage and the transient [`Forest`]:
//! - [`chromium`]: Chrome and Edge `Bookmarks` JSON, with the [`checksum`]
//! - [`firefox`]: `places.sqlite`
//!
//! Writers consult a [`guard::LivenessCheck`] and refuse to touch the
//! browser's files while it runs.

pub mod checksum;
pub mod chromium;
pub mod firefox;
pub mod guard;
pub mod profile;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use chromium::ChromiumCodec;
pub use firefox::FirefoxCodec;
pub use guard::{LivenessCheck, ProcessTable};

use marksync_core::{Browser, BrowserFamily, Config, Error, Forest, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capability set every browser format provides
pub trait BookmarkCodec: Send + Sync {
    fn browser(&self) -> Browser;

    /// Bookmark file or database this codec reads and writes
    fn path(&self) -> &Path;

    fn detect_installed(&self) -> bool {
        self.path().exists()
    }

    fn detect_running(&self) -> bool;

    fn read(&self) -> Result<Forest>;

    /// Replace the browser's bookmarks with `forest`
    ///
    /// Fails with [`Error::BrowserRunning`] without touching anything when
    /// the browser is alive.
    fn write(&self, forest: &Forest) -> Result<()>;
}

/// Codec for any supported browser, chosen by format family
pub enum Codec {
    Chromium(ChromiumCodec),
    Firefox(FirefoxCodec),
}

impl Codec {
    pub fn new(browser: Browser, path: PathBuf, liveness: Arc<dyn LivenessCheck>, config: &Config) -> Self {
        match browser.family() {
            BrowserFamily::Chromium => Codec::Chromium(
                ChromiumCodec::new(browser, path, liveness).verify_checksum(config.chromium.verify_checksum),
            ),
            BrowserFamily::Firefox => Codec::Firefox(FirefoxCodec::new(path, liveness)),
        }
    }

    /// Codec at the configured or auto-detected location
    pub fn detect(browser: Browser, liveness: Arc<dyn LivenessCheck>, config: &Config) -> Result<Self> {
        let path = profile::resolve_path(browser, &config.paths)
            .ok_or(Error::BrowserNotFound { browser, path: None })?;
        Ok(Self::new(browser, path, liveness, config))
    }

    fn inner(&self) -> &dyn BookmarkCodec {
        match self {
            Codec::Chromium(c) => c,
            Codec::Firefox(c) => c,
        }
    }
}

impl BookmarkCodec for Codec {
    fn browser(&self) -> Browser {
        self.inner().browser()
    }

    fn path(&self) -> &Path {
        self.inner().path()
    }

    fn detect_installed(&self) -> bool {
        self.inner().detect_installed()
    }

    fn detect_running(&self) -> bool {
        self.inner().detect_running()
    }

    fn read(&self) -> Result<Forest> {
        self.inner().read()
    }

    fn write(&self, forest: &Forest) -> Result<()> {
        self.inner().write(forest)
    }
}
