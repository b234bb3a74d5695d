//! Show store and browser status

use crate::util::{self, App};
use anyhow::Result;
use marksync_core::Browser;
use owo_colors::OwoColorize;

pub async fn run() -> Result<()> {
    // 1. Load config and store
    let app = App::load()?;
    let handle = app.open_store()?;
    let store_path = app.paths.store_file();

    // 2. Store summary
    println!("{}", "Marksync Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Store:         {}", store_path.display().to_string().cyan());
    if store_path.exists() {
        let store = handle.lock();
        println!("  Bookmarks:   {}", store.url_count());
        println!("  Folders:     {}", store.len() - store.url_count());
        println!(
            "  Modified:    {}",
            util::format_relative_time(store.last_modified())
        );
    } else {
        println!("  {}", "Not created yet. Run 'marksync init'".yellow());
    }
    println!();

    // 3. Browsers
    println!("Browsers:");
    for browser in Browser::ALL {
        match app.codec(browser) {
            Ok(codec) => {
                let state = if !codec.detect_installed() {
                    "not found".dimmed().to_string()
                } else if codec.detect_running() {
                    "running".yellow().to_string()
                } else {
                    "ready ✓".green().to_string()
                };
                println!("  {:<9} {}", browser.display_name(), state);
                println!("  {:<9} {}", "", codec.path().display().to_string().dimmed());
            }
            Err(_) => {
                println!("  {:<9} {}", browser.display_name(), "not detected".dimmed());
            }
        }
    }
    println!();

    // 4. Mode
    let mode = if app.config.sync.debug_mode {
        "interactive (sync.debug_mode = true)"
    } else {
        "automatic"
    };
    println!("Sync mode:     {}", mode);
    println!("Backups:       {}", app.paths.backup_dir().display().to_string().dimmed());

    Ok(())
}
