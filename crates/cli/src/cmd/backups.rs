//! List backups

use crate::util::{self, App};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    let app = App::load()?;
    let backups = app.backups();
    let entries = backups.list().context("Failed to list backups")?;

    println!("{}", "Backups".bold());
    println!("{}: {}\n", "Location".dimmed(), backups.dir().display().dimmed());

    if entries.is_empty() {
        println!("  {}", "No backups yet".dimmed());
        return Ok(());
    }

    for entry in &entries {
        println!(
            "  {}  {:<8} {:>10}  {}",
            entry.created.format("%Y-%m-%d %H:%M:%S").to_string().yellow(),
            entry.label,
            util::format_size(entry.size),
            entry.file_name().dimmed()
        );
    }
    println!();
    println!("{}", "Restore with: marksync restore <file> <browser>".dimmed());
    Ok(())
}
