//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use marksync_codec::{BookmarkCodec, Codec, ProcessTable};
use marksync_core::{AppPaths, Browser, Config};
use marksync_ops::{BackupManager, BrowserOutcome, Progress, StoreHandle, TaskHandle};
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Home directory, config and the things built from them
pub struct App {
    pub paths: AppPaths,
    pub config: Config,
}

impl App {
    pub fn load() -> Result<Self> {
        let paths = AppPaths::discover().context("Failed to locate marksync home")?;
        let config = paths
            .load_config()
            .with_context(|| format!("Failed to load {}", paths.config_file().display()))?;
        debug!("Using marksync home {}", paths.home.display());
        Ok(Self { paths, config })
    }

    pub fn open_store(&self) -> Result<StoreHandle> {
        marksync_ops::load_store(&self.paths.store_file()).context("Failed to open bookmark store")
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::from_config(&self.paths, &self.config)
    }

    /// Codec at the configured or detected location
    pub fn codec(&self, browser: Browser) -> Result<Arc<dyn BookmarkCodec>> {
        let codec = Codec::detect(browser, Arc::new(ProcessTable), &self.config)
            .with_context(|| format!("Failed to locate {} bookmarks", browser.display_name()))?;
        Ok(Arc::new(codec))
    }

    /// Codecs for `browsers`, or for every installed browser when empty
    ///
    /// Browsers named explicitly but not locatable are returned separately.
    pub fn codecs(&self, browsers: &[Browser]) -> (Vec<Arc<dyn BookmarkCodec>>, Vec<(Browser, anyhow::Error)>) {
        let explicit = !browsers.is_empty();
        let wanted: Vec<Browser> = if explicit {
            browsers.to_vec()
        } else {
            Browser::ALL.to_vec()
        };

        let mut codecs = Vec::new();
        let mut missing = Vec::new();
        for browser in wanted {
            match self.codec(browser) {
                Ok(codec) if explicit || codec.detect_installed() => codecs.push(codec),
                Ok(_) => {}
                Err(e) if explicit => missing.push((browser, e)),
                Err(_) => {}
            }
        }
        (codecs, missing)
    }
}

/// Ask a yes/no question on stdin; anything but y/yes is no
pub fn confirm(prompt: &str) -> Result<bool> {
    print!("{} {} ", prompt, "[y/N]".dimmed());
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Follow a background task to completion, showing progress
///
/// Ctrl-C requests cancellation; the browser being written finishes first.
pub async fn follow<T>(mut task: TaskHandle<T>, verb: &str) -> Result<T> {
    let bar = spinner(&format!("{verb}..."));
    let cancel = task.cancel.clone();
    let mut cancelling = false;

    loop {
        tokio::select! {
            event = task.progress.recv() => match event {
                Some(Progress::Started { browser }) => {
                    bar.set_message(format!("{verb} {}...", browser.display_name()));
                }
                Some(Progress::Finished { .. }) => {}
                Some(Progress::Note(note)) => bar.set_message(note),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancelling => {
                cancelling = true;
                cancel.cancel();
                bar.set_message("Cancelling after the current browser...".to_string());
            }
        }
    }

    bar.finish_and_clear();
    task.join().await.context("Background task failed")
}

/// Print one line per browser; returns how many failed
pub fn report<T>(outcomes: &[BrowserOutcome<T>], describe: impl Fn(&T) -> String) -> usize {
    let mut failed = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(value) => println!(
                "  {} {:<8} {}",
                "✓".green(),
                outcome.browser.display_name(),
                describe(value)
            ),
            Err(e) => {
                failed += 1;
                println!(
                    "  {} {:<8} {}",
                    "✗".red(),
                    outcome.browser.display_name(),
                    e.to_string().red()
                );
            }
        }
    }
    failed
}

/// Format timestamp as relative time ("2 hours ago")
pub fn format_relative_time(ts: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - ts).num_seconds();
    if seconds < 0 {
        "in the future".to_string()
    } else if seconds < 60 {
        format!("{} seconds ago", seconds)
    } else if seconds < 3600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{} hours ago", seconds / 3600)
    } else if seconds < 604800 {
        format!("{} days ago", seconds / 86400)
    } else {
        format!("{} weeks ago", seconds / 604800)
    }
}

/// Format size in bytes as human-readable string
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
