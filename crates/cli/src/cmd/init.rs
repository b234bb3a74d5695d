//! Create the marksync home

use anyhow::{Context, Result};
use marksync_core::{AppPaths, Store};
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    // 1. Locate home
    let paths = AppPaths::discover().context("Failed to locate marksync home")?;

    // 2. Config and backup directory
    let created_config = paths
        .init_if_missing()
        .context("Failed to create marksync home")?;

    // 3. Empty store on first launch
    let store_path = paths.store_file();
    let created_store = !store_path.exists();
    if created_store {
        Store::new()
            .save(&store_path)
            .context("Failed to create bookmark store")?;
    }

    if !created_config && !created_store {
        println!("Marksync already initialized at {}", paths.home.display());
        return Ok(());
    }

    println!("{} Initialized marksync at {}", "✓".green(), paths.home.display().to_string().cyan());
    println!();
    println!("Created:");
    if created_config {
        println!("  - config.toml     (settings)");
    }
    if created_store {
        println!("  - bookmarks.json  (canonical bookmark store)");
    }
    println!("  - backups/        (snapshots taken before every browser write)");
    println!();
    println!("Next steps:");
    println!("  - Run 'marksync status' to see detected browsers");
    println!("  - Run 'marksync import' to pull in your bookmarks");

    Ok(())
}
