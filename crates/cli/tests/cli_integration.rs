//! End-to-end tests driving the `marksync` binary against a fake Chrome profile

mod common;

use anyhow::Result;
use common::TestHome;

/// Initialized home with Chrome pointed at the fixture file
fn setup(bar: &[(&str, &str)]) -> Result<TestHome> {
    let home = TestHome::new()?;
    home.write_chrome(bar)?;
    marks!(home.path(), "init").assert_success()?;
    let chrome = home.chrome_file().display().to_string();
    marks!(home.path(), "config", "set", "paths.chrome", &chrome).assert_success()?;
    Ok(home)
}

#[test]
fn test_init_creates_home() -> Result<()> {
    let home = TestHome::new()?;

    let result = marks!(home.path(), "init").assert_success()?;
    assert!(result.contains_stdout("Initialized marksync"));
    assert!(home.store_file().exists());
    assert!(home.marksync_home().join("config.toml").exists());
    assert!(home.backup_dir().is_dir());

    let again = marks!(home.path(), "init").assert_success()?;
    assert!(again.contains_stdout("already initialized"));
    Ok(())
}

#[test]
fn test_config_set_get_and_validation() -> Result<()> {
    let home = setup(&[])?;

    marks!(home.path(), "config", "set", "watcher.debounce_ms", "250").assert_success()?;
    let value = marks!(home.path(), "config", "get", "watcher.debounce_ms").assert_success()?;
    assert_eq!(value.stdout.trim(), "250");

    let chrome = marks!(home.path(), "config", "get", "paths.chrome").assert_success()?;
    assert_eq!(chrome.stdout.trim(), home.chrome_file().display().to_string());

    // Out of range and unknown keys are rejected
    marks!(home.path(), "config", "set", "watcher.debounce_ms", "1").assert_failure()?;
    marks!(home.path(), "config", "get", "nope.nothing").assert_failure()?;

    // Empty value clears a path override
    marks!(home.path(), "config", "set", "paths.edge", "").assert_success()?;
    let edge = marks!(home.path(), "config", "get", "paths.edge").assert_success()?;
    assert_eq!(edge.stdout.trim(), "");
    Ok(())
}

#[test]
fn test_status_reports_configured_browser() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;

    let result = marks!(home.path(), "status").assert_success()?;
    assert!(result.contains_stdout("Marksync Status"));
    assert!(result.contains_stdout("Bookmarks:   0"));
    assert!(result.contains_stdout(&home.chrome_file().display().to_string()));
    Ok(())
}

#[test]
fn test_import_is_idempotent() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/"), ("Docs", "https://docs.rs/")])?;

    marks!(home.path(), "import", "chrome").assert_success()?;
    assert_eq!(home.store_url_count()?, 2);

    marks!(home.path(), "import", "chrome").assert_success()?;
    assert_eq!(home.store_url_count()?, 2);

    let list = marks!(home.path(), "list").assert_success()?;
    assert!(list.contains_stdout("GitHub"));
    assert!(list.contains_stdout("https://docs.rs/"));
    Ok(())
}

#[test]
fn test_import_missing_file_fails() -> Result<()> {
    let home = setup(&[])?;
    std::fs::remove_file(home.chrome_file())?;

    marks!(home.path(), "import", "chrome").assert_failure()?;
    Ok(())
}

#[test]
fn test_push_requires_confirmation() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("Other", "https://example.com/")])?;

    // Declined: file untouched
    let result = marks!(home.path(), "push", "chrome").stdin("n\n").assert_success()?;
    assert!(result.contains_stdout("Push cancelled"));
    assert_eq!(home.chrome_bar_urls()?, vec!["https://example.com/"]);
    assert!(home.backup_names()?.is_empty());
    Ok(())
}

#[test]
fn test_push_replaces_and_backs_up() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("Other", "https://example.com/")])?;

    marks!(home.path(), "push", "chrome", "-y").assert_success()?;

    assert_eq!(home.chrome_bar_urls()?, vec!["https://github.com/"]);
    let backups = home.backup_names()?;
    assert_eq!(backups.len(), 1);
    assert!(backups[0].starts_with("chrome_Bookmarks."));
    Ok(())
}

#[test]
fn test_sync_dry_run_changes_nothing() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("GitHub", "https://github.com/"), ("Docs", "https://docs.rs/")])?;

    let result = marks!(home.path(), "sync", "chrome", "--dry-run").assert_success()?;
    assert!(result.contains_stdout("Store inserts:   1"));
    assert!(result.contains_stdout("Dry run"));
    assert_eq!(home.store_url_count()?, 1);
    Ok(())
}

#[test]
fn test_sync_auto_is_additive_both_ways() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/"), ("Docs", "https://docs.rs/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("GitHub", "https://github.com/"), ("Crates", "https://crates.io/")])?;

    marks!(home.path(), "sync", "chrome", "--auto").assert_success()?;

    assert_eq!(home.store_url_count()?, 3);
    let mut urls = home.chrome_bar_urls()?;
    urls.sort();
    assert_eq!(urls, vec!["https://crates.io/", "https://docs.rs/", "https://github.com/"]);

    // Converged
    let again = marks!(home.path(), "sync", "chrome", "--auto").assert_success()?;
    assert!(again.contains_stdout("Already in sync"));
    Ok(())
}

#[test]
fn test_sync_interactive_reads_decisions_from_stdin() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("GitHub", "https://github.com/"), ("Docs", "https://docs.rs/")])?;

    let skipped = marks!(home.path(), "sync", "chrome", "--interactive")
        .stdin("s\n")
        .assert_success()?;
    assert!(skipped.contains_stdout("Skipped: 1"));
    assert_eq!(home.store_url_count()?, 1);

    marks!(home.path(), "sync", "chrome", "--interactive")
        .stdin("a\n")
        .assert_success()?;
    assert_eq!(home.store_url_count()?, 2);
    Ok(())
}

#[test]
fn test_export_then_load_into_fresh_home() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/"), ("Docs", "https://docs.rs/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    let file = home.path().join("export.json");
    let file_arg = file.display().to_string();
    marks!(home.path(), "export", &file_arg).assert_success()?;
    assert!(file.exists());

    let fresh = TestHome::new()?;
    marks!(fresh.path(), "init").assert_success()?;
    marks!(fresh.path(), "load", &file_arg).assert_success()?;
    assert_eq!(fresh.store_url_count()?, 2);

    // Loading again adds nothing
    let result = marks!(fresh.path(), "load", &file_arg).assert_success()?;
    assert!(result.contains_stdout("0 added"));
    assert_eq!(fresh.store_url_count()?, 2);
    Ok(())
}

#[test]
fn test_load_rejects_invalid_file() -> Result<()> {
    let home = setup(&[])?;
    let file = home.path().join("garbage.json");
    std::fs::write(&file, "{ not json")?;

    marks!(home.path(), "load", &file.display().to_string()).assert_failure()?;
    Ok(())
}

#[test]
fn test_backups_and_restore() -> Result<()> {
    let home = setup(&[("GitHub", "https://github.com/")])?;
    marks!(home.path(), "import", "chrome").assert_success()?;
    home.write_chrome(&[("Other", "https://example.com/")])?;
    marks!(home.path(), "push", "chrome", "-y").assert_success()?;

    let backups = home.backup_names()?;
    assert_eq!(backups.len(), 1);
    let listed = marks!(home.path(), "backups").assert_success()?;
    assert!(listed.contains_stdout(&backups[0]));

    // A chrome backup cannot be restored into firefox
    marks!(home.path(), "restore", &backups[0], "firefox", "-y").assert_failure()?;

    marks!(home.path(), "restore", &backups[0], "chrome", "-y").assert_success()?;
    assert_eq!(home.chrome_bar_urls()?, vec!["https://example.com/"]);
    // The replaced file was itself backed up
    assert_eq!(home.backup_names()?.len(), 2);
    Ok(())
}
