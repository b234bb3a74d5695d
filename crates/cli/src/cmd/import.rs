//! Import bookmarks from browsers into the store

use crate::util::{self, App};
use anyhow::{Context, Result};
use marksync_core::Browser;
use marksync_ops::{Conflict, Resolution};
use owo_colors::OwoColorize;

pub async fn run(browsers: Vec<Browser>, prefer_incoming: bool) -> Result<()> {
    // 1. Load config and store
    let app = App::load()?;
    let handle = app.open_store()?;

    // 2. Pick browsers
    let (codecs, missing) = app.codecs(&browsers);
    for (browser, e) in &missing {
        println!("  {} {:<8} {:#}", "✗".red(), browser.display_name(), e);
    }
    if codecs.is_empty() {
        if missing.is_empty() {
            println!("{}", "No installed browsers found.".yellow());
            println!("{}", "Set a path with 'marksync config set paths.chrome <file>'".dimmed());
            return Ok(());
        }
        anyhow::bail!("No browsers to import from");
    }

    // 3. Import in the background
    let total = codecs.len() + missing.len();
    let task_handle = handle.clone();
    let task = marksync_ops::spawn(move |control| {
        Ok(marksync_ops::import(&task_handle, &codecs, &control))
    });
    let outcomes = util::follow(task, "Importing").await?;

    // 4. Report
    println!("{}", "Import".bold());
    let failed = missing.len() + util::report(&outcomes, |s| {
        format!(
            "{} added, {} folders created, {} already present, {} conflicts",
            s.added,
            s.folders_created,
            s.skipped,
            s.conflicts.len()
        )
    });

    // 5. Conflicts
    let conflicts: Vec<Conflict> = outcomes
        .into_iter()
        .filter_map(|o| o.result.ok())
        .flat_map(|s| s.conflicts)
        .collect();

    if !conflicts.is_empty() {
        println!();
        if prefer_incoming {
            let resolutions: Vec<_> = conflicts
                .into_iter()
                .map(|c| (c, Resolution::UseIncoming))
                .collect();
            let applied = marksync_ops::resolve_conflicts(&handle, &resolutions)
                .context("Failed to apply conflict resolutions")?;
            println!("{} Took the browser's title for {} bookmarks", "✓".green(), applied);
        } else {
            println!("{} ({} kept as-is):", "Title conflicts".yellow(), conflicts.len());
            for c in &conflicts {
                let source = c.browser.map(|b| b.display_name()).unwrap_or("file");
                println!("  {} {}", c.path.to_string().dimmed(), c.url);
                println!("    store:  {}", c.existing_title);
                println!("    {:<7} {}", format!("{}:", source.to_lowercase()), c.incoming.title);
            }
            println!();
            println!("{}", "Re-run with --prefer-incoming to take the browser's titles".dimmed());
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} browsers failed", failed, total);
    }
    Ok(())
}
