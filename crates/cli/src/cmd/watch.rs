//! Watch the store file and reload on external changes

use crate::util::App;
use anyhow::{Context, Result};
use chrono::Local;
use marksync_ops::WatchOptions;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

pub async fn run() -> Result<()> {
    // 1. Load config and store; the file must exist to be watched
    let app = App::load()?;
    let handle = app.open_store()?;
    if !handle.path().exists() {
        handle.save().context("Failed to create bookmark store")?;
    }

    // 2. Start the watcher
    let (tx, mut rx) = mpsc::unbounded_channel();
    let options = WatchOptions::from(&app.config.watcher);
    let _watch = handle
        .watch(options, move || {
            let _ = tx.send(());
        })
        .context("Failed to watch bookmark store")?;

    println!(
        "Watching {} {}",
        handle.path().display().to_string().cyan(),
        "(Ctrl-C to stop)".dimmed()
    );

    // 3. Report reloads until interrupted
    loop {
        tokio::select! {
            Some(()) = rx.recv() => {
                let count = handle.lock().url_count();
                println!(
                    "{} {} Reloaded: {} bookmarks",
                    Local::now().format("%H:%M:%S").to_string().dimmed(),
                    "↻".cyan(),
                    count
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("Stopped watching");
    Ok(())
}
