//! Replace browsers' bookmarks with the store

use crate::util::{self, App};
use anyhow::Result;
use marksync_core::Browser;
use owo_colors::OwoColorize;

pub async fn run(browsers: Vec<Browser>, yes: bool) -> Result<()> {
    // 1. Load config and store
    let app = App::load()?;
    let handle = app.open_store()?;
    let backups = app.backups();

    // 2. Resolve targets
    let (codecs, missing) = app.codecs(&browsers);
    for (browser, e) in &missing {
        println!("  {} {:<8} {:#}", "✗".red(), browser.display_name(), e);
    }
    if codecs.is_empty() {
        anyhow::bail!("No browsers to push to");
    }

    // 3. Confirm the overwrite
    let names: Vec<&str> = codecs.iter().map(|c| c.browser().display_name()).collect();
    let url_count = handle.lock().url_count();
    if !yes {
        println!(
            "{} This replaces every bookmark in {} with the store's {} bookmarks.",
            "Warning:".yellow(),
            names.join(", ").bold(),
            url_count
        );
        println!("{}", "The current files are backed up first.".dimmed());
        if !util::confirm("Continue?")? {
            println!("Push cancelled");
            return Ok(());
        }
    }

    // 4. Push in the background
    let total = codecs.len() + missing.len();
    let task_handle = handle.clone();
    let task_backups = backups.clone();
    let task = marksync_ops::spawn(move |control| {
        Ok(marksync_ops::push(&task_handle, &codecs, &task_backups, &control))
    });
    let outcomes = util::follow(task, "Pushing").await?;

    // 5. Report
    println!("{}", "Push".bold());
    let failed = missing.len()
        + util::report(&outcomes, |s| {
            let backup = s
                .backup
                .as_ref()
                .and_then(|b| b.file_name())
                .map(|n| format!("(backup: {})", n.to_string_lossy()))
                .unwrap_or_default();
            format!("{} nodes written {}", s.nodes_written, backup.dimmed())
        });

    if failed > 0 {
        anyhow::bail!("{} of {} browsers failed", failed, total);
    }
    Ok(())
}
