//! Process liveness guard
//!
//! Browsers keep their bookmark state in memory and rewrite the file on exit,
//! so a write made while the browser runs is either lost or corrupts the
//! database. Writers ask a [`LivenessCheck`] immediately before writing.

use marksync_core::Browser;
use std::collections::HashSet;
use tracing::debug;

/// Answers "is this browser's process alive right now?"
pub trait LivenessCheck: Send + Sync {
    fn is_running(&self, browser: Browser) -> bool;
}

impl<F> LivenessCheck for F
where
    F: Fn(Browser) -> bool + Send + Sync,
{
    fn is_running(&self, browser: Browser) -> bool {
        self(browser)
    }
}

/// Check backed by the operating system's process list, polled per call
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTable;

impl LivenessCheck for ProcessTable {
    fn is_running(&self, browser: Browser) -> bool {
        let names = running_process_names();
        let alive = browser
            .process_names()
            .iter()
            .any(|candidate| names.iter().any(|n| name_matches(n, candidate)));
        debug!("Liveness check for {}: {}", browser, alive);
        alive
    }
}

/// Compare a listed process name with a known executable name
///
/// Linux truncates `comm` to 15 bytes, so a 15-byte name also matches any
/// candidate it is a prefix of. Comparison ignores case for Windows.
fn name_matches(listed: &str, candidate: &str) -> bool {
    let listed = listed.to_ascii_lowercase();
    listed == candidate || (listed.len() == 15 && candidate.starts_with(&listed))
}

#[cfg(target_os = "linux")]
fn running_process_names() -> HashSet<String> {
    let mut names = HashSet::new();
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return names;
    };
    for entry in entries.flatten() {
        let is_pid = entry
            .file_name()
            .to_str()
            .is_some_and(|s| s.bytes().all(|b| b.is_ascii_digit()));
        if !is_pid {
            continue;
        }
        // Processes can exit between listing and reading
        if let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) {
            names.insert(comm.trim().to_string());
        }
    }
    names
}

#[cfg(all(unix, not(target_os = "linux")))]
fn running_process_names() -> HashSet<String> {
    let output = match std::process::Command::new("ps").args(["-A", "-o", "comm="]).output() {
        Ok(out) => out,
        Err(e) => {
            debug!("ps failed: {}", e);
            return HashSet::new();
        }
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.trim().rsplit('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(windows)]
fn running_process_names() -> HashSet<String> {
    let output = match std::process::Command::new("tasklist").args(["/FO", "CSV", "/NH"]).output() {
        Ok(out) => out,
        Err(e) => {
            debug!("tasklist failed: {}", e);
            return HashSet::new();
        }
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(|name| name.trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(not(any(unix, windows)))]
fn running_process_names() -> HashSet<String> {
    HashSet::new()
}
