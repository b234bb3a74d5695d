//! Locating browser bookmark files on this machine

use marksync_core::config::PathsConfig;
use marksync_core::Browser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configured override, else the platform default location
pub fn resolve_path(browser: Browser, overrides: &PathsConfig) -> Option<PathBuf> {
    if let Some(path) = overrides.get(browser) {
        return Some(path.to_path_buf());
    }
    default_path(browser)
}

/// Where the browser keeps its bookmarks by default, if it can be determined
pub fn default_path(browser: Browser) -> Option<PathBuf> {
    match browser {
        Browser::Chrome | Browser::Edge => {
            chromium_user_data(browser).map(|d| d.join("Default").join("Bookmarks"))
        }
        Browser::Firefox => firefox_root().and_then(|root| find_firefox_places(&root)),
    }
}

#[cfg(target_os = "linux")]
fn chromium_user_data(browser: Browser) -> Option<PathBuf> {
    let dir = match browser {
        Browser::Edge => "microsoft-edge",
        _ => "google-chrome",
    };
    dirs::config_dir().map(|c| c.join(dir))
}

#[cfg(target_os = "macos")]
fn chromium_user_data(browser: Browser) -> Option<PathBuf> {
    let dir = match browser {
        Browser::Edge => "Microsoft Edge",
        _ => "Google/Chrome",
    };
    dirs::data_dir().map(|d| d.join(dir))
}

#[cfg(windows)]
fn chromium_user_data(browser: Browser) -> Option<PathBuf> {
    let dir = match browser {
        Browser::Edge => "Microsoft/Edge/User Data",
        _ => "Google/Chrome/User Data",
    };
    dirs::data_local_dir().map(|d| d.join(dir))
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
fn chromium_user_data(_browser: Browser) -> Option<PathBuf> {
    None
}

fn firefox_root() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::data_dir().map(|d| d.join("Firefox"))
    } else if cfg!(windows) {
        dirs::config_dir().map(|d| d.join("Mozilla").join("Firefox"))
    } else {
        dirs::home_dir().map(|h| h.join(".mozilla").join("firefox"))
    }
}

/// Pick the default profile's `places.sqlite` under a Firefox root
///
/// Order: the `[Install*]` default, then a profile marked `Default=1`, then
/// any listed profile, then any directory that simply has `places.sqlite`.
pub fn find_firefox_places(root: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(text) = std::fs::read_to_string(root.join("profiles.ini")) {
        let sections = parse_ini(&text);

        for (name, keys) in &sections {
            if name.starts_with("Install") {
                if let Some(path) = keys.get("Default") {
                    candidates.push(root.join(path));
                }
            }
        }

        let profiles: Vec<_> = sections
            .iter()
            .filter(|(name, _)| name.starts_with("Profile"))
            .filter_map(|(_, keys)| {
                let path = keys.get("Path")?;
                let relative = keys.get("IsRelative").map_or(true, |v| v == "1");
                let dir = if relative { root.join(path) } else { PathBuf::from(path) };
                Some((keys.get("Default").is_some_and(|v| v == "1"), dir))
            })
            .collect();
        candidates.extend(profiles.iter().filter(|(default, _)| *default).map(|(_, d)| d.clone()));
        candidates.extend(profiles.into_iter().map(|(_, d)| d));
    }

    for dir in [root.to_path_buf(), root.join("Profiles")] {
        if let Ok(entries) = std::fs::read_dir(&dir) {
            let mut found: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            found.sort();
            candidates.extend(found);
        }
    }

    let places = candidates
        .into_iter()
        .map(|dir| dir.join("places.sqlite"))
        .find(|p| p.is_file());
    debug!("Firefox profile under {}: {:?}", root.display(), places);
    places
}

/// Minimal INI reader: `[section]` headers and `key=value` lines
fn parse_ini(text: &str) -> Vec<(String, HashMap<String, String>)> {
    let mut sections: Vec<(String, HashMap<String, String>)> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            sections.push((name.to_string(), HashMap::new()));
        } else if let (Some((key, value)), Some((_, keys))) = (line.split_once('='), sections.last_mut()) {
            keys.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    sections
}
