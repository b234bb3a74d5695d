//! Additive two-way sync with one browser

use crate::util::{self, App};
use anyhow::{Context, Result};
use marksync_core::Browser;
use marksync_ops::{Confirm, Decision, ExecMode, SyncAction};
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};

/// Prompts on stdin for each action; end of input skips the rest
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, action: &SyncAction) -> Decision {
        println!("  {}", action);
        loop {
            print!("    {} ", "[a]pply / [s]kip / apply [A]ll:".dimmed());
            if std::io::stdout().flush().is_err() {
                return Decision::Skip;
            }
            let mut answer = String::new();
            match std::io::stdin().lock().read_line(&mut answer) {
                Ok(0) | Err(_) => return Decision::Skip,
                Ok(_) => {}
            }
            match answer.trim() {
                "a" | "" => return Decision::Apply,
                "s" => return Decision::Skip,
                "A" => return Decision::ApplyAll,
                _ => continue,
            }
        }
    }
}

/// `interactive` overrides `sync.debug_mode` when given
pub async fn run(browser: Browser, dry_run: bool, interactive: Option<bool>) -> Result<()> {
    // 1. Load config, store and codec
    let app = App::load()?;
    let handle = app.open_store()?;
    let codec = app.codec(browser)?;
    let backups = app.backups();

    // 2. Plan in the background
    let task_handle = handle.clone();
    let task_codec = codec.clone();
    let task = marksync_ops::spawn(move |_| marksync_ops::plan_sync(&task_handle, task_codec.as_ref()));
    let plan = util::follow(task, "Reading")
        .await
        .with_context(|| format!("Failed to plan sync with {}", browser.display_name()))?;
    let (inserts, updates, browser_inserts) = plan.counts();

    println!("{} {}", "Sync plan for".bold(), browser.display_name().bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if plan.is_empty() {
        println!("{} Already in sync", "✓".green());
        return Ok(());
    }
    println!("  Store inserts:   {}", inserts);
    println!("  Store updates:   {}", updates);
    println!("  Browser inserts: {}", browser_inserts);
    println!();

    // 3. Dry run stops here
    if dry_run {
        for action in &plan.actions {
            println!("  {}", action);
        }
        println!();
        println!("{}", "Dry run: nothing applied".dimmed());
        return Ok(());
    }

    // 4. Execute in the background; prompts are read from the blocking task
    let debug_mode = interactive.unwrap_or(app.config.sync.debug_mode);
    let task_handle = handle.clone();
    let task = marksync_ops::spawn(move |control| {
        let mut prompt = StdinConfirm;
        let mode = ExecMode::select(debug_mode, &mut prompt);
        Ok(marksync_ops::execute(&task_handle, plan, codec.as_ref(), &backups, mode, &control))
    });
    let outcome = if debug_mode {
        task.join().await.context("Background task failed")?
    } else {
        util::follow(task, "Syncing").await?
    };

    // 5. Report
    println!("{} Store: {} inserted, {} updated", "✓".green(), outcome.store_inserted, outcome.store_updated);
    if outcome.skipped > 0 {
        println!("  Skipped: {}", outcome.skipped);
    }
    if outcome.cancelled {
        println!("  {}", "Cancelled before every action ran".yellow());
    }
    for (action, e) in &outcome.store_errors {
        println!("{} {}: {}", "✗".red(), action, e.to_string().red());
    }
    match &outcome.browser_error {
        Some(e) => {
            println!("{} {} was not updated: {}", "✗".red(), browser.display_name(), e.to_string().red());
        }
        None if outcome.browser_inserted > 0 => {
            println!(
                "{} {}: {} inserted",
                "✓".green(),
                browser.display_name(),
                outcome.browser_inserted
            );
            if let Some(backup) = outcome.backup.as_ref().and_then(|b| b.file_name()) {
                println!("  {}", format!("Backup: {}", backup.to_string_lossy()).dimmed());
            }
        }
        None => {}
    }

    if !outcome.is_clean() {
        anyhow::bail!(
            "Sync with {} finished with {} failed actions",
            browser.display_name(),
            outcome.store_errors.len() + usize::from(outcome.browser_error.is_some())
        );
    }
    Ok(())
}
