//! Isolated marksync homes with a fake Chrome profile

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary `$HOME` holding a marksync home and a Chrome `Bookmarks` file
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("Failed to create temp dir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn marksync_home(&self) -> PathBuf {
        self.dir.path().join("marksync")
    }

    pub fn store_file(&self) -> PathBuf {
        self.marksync_home().join("bookmarks.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.marksync_home().join("backups")
    }

    pub fn chrome_file(&self) -> PathBuf {
        self.dir.path().join("chrome-profile").join("Bookmarks")
    }

    /// Write a Chrome `Bookmarks` file whose bar holds `bar` as (title, url)
    ///
    /// The checksum is left empty, which Chrome and marksync both accept.
    pub fn write_chrome(&self, bar: &[(&str, &str)]) -> Result<()> {
        let children: Vec<Value> = bar
            .iter()
            .enumerate()
            .map(|(i, (title, url))| {
                json!({
                    "date_added": "13350000000000000",
                    "guid": format!("00000000-0000-4000-8000-{:012}", i + 10),
                    "id": (i + 10).to_string(),
                    "name": title,
                    "type": "url",
                    "url": url,
                })
            })
            .collect();
        let root = |id: &str, guid: &str, name: &str, children: Vec<Value>| {
            json!({
                "children": children,
                "date_added": "13340000000000000",
                "date_modified": "0",
                "guid": guid,
                "id": id,
                "name": name,
                "type": "folder",
            })
        };
        let doc = json!({
            "checksum": "",
            "roots": {
                "bookmark_bar": root("1", "0bc5d13f-2cba-5d74-951f-3f233fe6c908", "Bookmarks bar", children),
                "other": root("2", "82b081ec-3dd3-529c-8475-ab6c344590dd", "Other bookmarks", vec![]),
                "synced": root("3", "4cf2e351-0e85-532b-bb37-df045d8f8d0f", "Mobile bookmarks", vec![]),
            },
            "version": 1,
        });

        let path = self.chrome_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)?;
        Ok(())
    }

    /// URLs directly under Chrome's bookmark bar
    pub fn chrome_bar_urls(&self) -> Result<Vec<String>> {
        let doc: Value = serde_json::from_slice(&std::fs::read(self.chrome_file())?)?;
        let urls = doc["roots"]["bookmark_bar"]["children"]
            .as_array()
            .map(|children| {
                children
                    .iter()
                    .filter_map(|c| c["url"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(urls)
    }

    /// Number of URL nodes in the canonical store file
    pub fn store_url_count(&self) -> Result<usize> {
        fn count(node: &Value) -> usize {
            let own = usize::from(node["type"] == "url");
            let nested: usize = node["children"]
                .as_array()
                .map(|children| children.iter().map(count).sum())
                .unwrap_or_default();
            own + nested
        }
        let doc: Value = serde_json::from_slice(&std::fs::read(self.store_file())?)?;
        Ok(count(&doc["roots"]["bookmark_bar"]) + count(&doc["roots"]["other"]))
    }

    pub fn backup_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.backup_dir()) {
            for entry in entries {
                names.push(entry?.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
