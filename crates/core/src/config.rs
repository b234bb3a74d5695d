//! Application home and `config.toml`
//!
//! Layout of the home directory (`$MARKSYNC_HOME`, default `~/.marksync`):
//! ```text
//! ~/.marksync/
//!   config.toml
//!   bookmarks.json
//!   backups/
//! ```

use crate::error::{Error, Result};
use crate::fs::atomic_write;
use crate::node::Browser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that relocates the application home
pub const HOME_ENV: &str = "MARKSYNC_HOME";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub watcher: WatcherConfig,
    pub backup: BackupConfig,
    pub chromium: ChromiumConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Confirm each sync action instead of applying the plan wholesale
    pub debug_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Quiet period before an external store change triggers a reload
    pub debounce_ms: u64,
    /// How long events are ignored after we save the store ourselves
    pub suppress_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            suppress_ms: 200,
        }
    }
}

impl WatcherConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn suppress(&self) -> Duration {
        Duration::from_millis(self.suppress_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Backups kept per target file (0 = keep all)
    pub keep: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self { keep: 20 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromiumConfig {
    /// Refuse to read a `Bookmarks` file whose checksum does not match
    pub verify_checksum: bool,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self { verify_checksum: true }
    }
}

/// Explicit bookmark file locations; unset entries are auto-detected
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chrome: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firefox: Option<PathBuf>,
}

impl PathsConfig {
    pub fn get(&self, browser: Browser) -> Option<&Path> {
        match browser {
            Browser::Chrome => self.chrome.as_deref(),
            Browser::Edge => self.edge.as_deref(),
            Browser::Firefox => self.firefox.as_deref(),
        }
    }

    pub fn set(&mut self, browser: Browser, path: Option<PathBuf>) {
        match browser {
            Browser::Chrome => self.chrome = path,
            Browser::Edge => self.edge = path,
            Browser::Firefox => self.firefox = path,
        }
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(10..=5000).contains(&self.watcher.debounce_ms) {
            return Err(Error::validation(format!(
                "watcher.debounce_ms must be 10-5000, got {}",
                self.watcher.debounce_ms
            )));
        }
        if self.watcher.suppress_ms > 10_000 {
            return Err(Error::validation(format!(
                "watcher.suppress_ms must be 0-10000, got {}",
                self.watcher.suppress_ms
            )));
        }
        Ok(())
    }

    /// Read a config file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::io_at(path, e))?;
        let config: Config = toml::from_str(&text)
            .map_err(|e| Error::validation(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::validation(format!("serialize config: {e}")))?;
        atomic_write(path, text.as_bytes())
    }
}

/// Resolved locations inside the application home
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub home: PathBuf,
}

impl AppPaths {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// `$MARKSYNC_HOME`, else `~/.marksync`
    pub fn discover() -> Result<Self> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(home));
        }
        dirs::home_dir()
            .map(|h| Self::new(h.join(".marksync")))
            .ok_or_else(|| Error::validation("could not determine home directory"))
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn store_file(&self) -> PathBuf {
        self.home.join("bookmarks.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.home.join("backups")
    }

    pub fn load_config(&self) -> Result<Config> {
        Config::load_from(&self.config_file())
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        config.save_to(&self.config_file())
    }

    /// Create the home layout and a default config if absent
    pub fn init_if_missing(&self) -> Result<bool> {
        let backups = self.backup_dir();
        std::fs::create_dir_all(&backups).map_err(|e| Error::io_at(&backups, e))?;
        let config = self.config_file();
        if config.exists() {
            return Ok(false);
        }
        atomic_write(&config, example_config().as_bytes())?;
        Ok(true)
    }
}

/// Annotated default configuration
pub fn example_config() -> String {
    r#"# marksync configuration

[sync]
# Ask before applying each sync action
debug_mode = false

[watcher]
# Quiet period (ms) before an external change to the store is reloaded
debounce_ms = 100
# Events are ignored for this long (ms) after marksync saves the store itself
suppress_ms = 200

[backup]
# Backups kept per browser file (0 = keep all)
keep = 20

[chromium]
# Refuse to read Bookmarks files whose checksum does not match their content
verify_checksum = true

[paths]
# Override auto-detected bookmark locations
# chrome = "/home/me/.config/google-chrome/Default/Bookmarks"
# edge = "/home/me/.config/microsoft-edge/Default/Bookmarks"
# firefox = "/home/me/.mozilla/firefox/abcd.default-release/places.sqlite"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.sync.debug_mode);
        assert_eq!(config.watcher.debounce(), Duration::from_millis(100));
        assert_eq!(config.backup.keep, 20);
        assert!(config.chromium.verify_checksum);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses_to_defaults() {
        let parsed: Config = toml::from_str(&example_config()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\ndebug_mode = true\n[paths]\nfirefox = \"/x/places.sqlite\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.sync.debug_mode);
        assert_eq!(config.watcher.debounce_ms, 100);
        assert_eq!(config.paths.get(Browser::Firefox), Some(Path::new("/x/places.sqlite")));
        assert_eq!(config.paths.get(Browser::Chrome), None);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = Config::default();
        config.watcher.debounce_ms = 1;
        assert!(config.validate().is_err());

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[watcher]\ndebounce_ms = 999999\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Validation(_))));

        std::fs::write(&path, "[watcher\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Validation(_))));
    }

    #[test]
    fn test_save_load_and_init() {
        let temp_dir = TempDir::new().unwrap();
        let paths = AppPaths::new(temp_dir.path().join("home"));

        assert!(paths.init_if_missing().unwrap());
        assert!(!paths.init_if_missing().unwrap());
        assert!(paths.backup_dir().is_dir());

        let mut config = paths.load_config().unwrap();
        config.backup.keep = 3;
        config.paths.set(Browser::Edge, Some(PathBuf::from("/e/Bookmarks")));
        paths.save_config(&config).unwrap();

        assert_eq!(paths.load_config().unwrap(), config);
    }
}
