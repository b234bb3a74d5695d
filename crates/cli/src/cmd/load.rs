//! Load a portable file into the store

use crate::util::App;
use anyhow::{Context, Result};
use marksync_ops::{FileImportMode, Resolution};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(file: &Path, mode: FileImportMode, prefer_incoming: bool) -> Result<()> {
    // 1. Load config and store
    let app = App::load()?;
    let handle = app.open_store()?;
    let backups = app.backups();

    // 2. Validate and preview
    let preview = marksync_ops::plan_file_import(&handle.lock(), file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    println!("{} {}", "Loading".bold(), file.display());
    match mode {
        FileImportMode::Overwrite => {
            println!("  Replacing the store with {} bookmarks", preview.incoming.url_count());
        }
        FileImportMode::Merge => {
            println!("  New:        {}", preview.to_add.len());
            println!("  Present:    {}", preview.skipped);
            println!("  Conflicts:  {}", preview.conflicts.len());
        }
    }

    // 3. Apply
    let resolution = if prefer_incoming {
        Resolution::UseIncoming
    } else {
        Resolution::KeepExisting
    };
    let outcome = marksync_ops::execute_file_import(&handle, preview, mode, resolution, &backups)
        .context("Failed to load portable file")?;

    println!(
        "{} {} added, {} conflicts resolved",
        "✓".green(),
        outcome.added,
        outcome.resolved
    );
    if let Some(backup) = outcome.backup.as_ref().and_then(|b| b.file_name()) {
        println!("  {}", format!("Previous store saved as {}", backup.to_string_lossy()).dimmed());
    }
    Ok(())
}
