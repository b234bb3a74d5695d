//! Restore a browser's bookmark file from a backup

use crate::util::{self, App};
use anyhow::{Context, Result};
use marksync_core::Browser;
use owo_colors::OwoColorize;

pub async fn run(backup: &str, browser: Browser, yes: bool) -> Result<()> {
    // 1. Find the backup
    let app = App::load()?;
    let backups = app.backups();
    let source = backups
        .resolve(backup)
        .with_context(|| format!("Backup not found: {}", backup))?;

    // 2. Refuse backups of another browser
    let entry = backups
        .list()?
        .into_iter()
        .find(|e| e.path == source);
    if let Some(entry) = &entry {
        if entry.label != browser.as_str() {
            anyhow::bail!(
                "Backup {} was taken from {}, not {}",
                entry.file_name(),
                entry.label,
                browser.as_str()
            );
        }
    }

    // 3. Browser must be closed
    let codec = app.codec(browser)?;
    if codec.detect_running() {
        anyhow::bail!("{} is running; close it before restoring", browser.display_name());
    }

    if !yes {
        println!(
            "{} This replaces {} with {}.",
            "Warning:".yellow(),
            codec.path().display().to_string().bold(),
            source.display()
        );
        if !util::confirm("Continue?")? {
            println!("Restore cancelled");
            return Ok(());
        }
    }

    // 4. Snapshot the current file, then restore
    let previous = backups
        .snapshot(browser.as_str(), codec.path())
        .context("Failed to back up current file")?;
    backups
        .restore(&source, codec.path())
        .with_context(|| format!("Failed to restore {}", codec.path().display()))?;

    println!("{} Restored {} bookmarks", "✓".green(), browser.display_name());
    if let Some(previous) = previous.as_ref().and_then(|p| p.file_name()) {
        println!("  {}", format!("Replaced file saved as {}", previous.to_string_lossy()).dimmed());
    }
    Ok(())
}
