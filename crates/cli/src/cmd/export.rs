//! Export the store to a portable file

use crate::util::App;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub async fn run(file: &Path) -> Result<()> {
    let app = App::load()?;
    let handle = app.open_store()?;
    let store = handle.lock();

    marksync_ops::export_store(&store, file)
        .with_context(|| format!("Failed to export to {}", file.display()))?;

    println!(
        "{} Exported {} bookmarks to {}",
        "✓".green(),
        store.url_count(),
        file.display().to_string().cyan()
    );
    Ok(())
}
