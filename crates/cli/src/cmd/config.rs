//! Configuration management command
//!
//! Provides CLI interface to view and edit `config.toml`.

use anyhow::{Context, Result};
use marksync_core::{example_config, AppPaths, Browser, Config};
use owo_colors::OwoColorize;
use std::path::PathBuf;

const KEYS: &[&str] = &[
    "sync.debug_mode",
    "watcher.debounce_ms",
    "watcher.suppress_ms",
    "backup.keep",
    "chromium.verify_checksum",
    "paths.chrome",
    "paths.edge",
    "paths.firefox",
];

fn load() -> Result<(AppPaths, Config)> {
    let paths = AppPaths::discover().context("Failed to locate marksync home")?;
    let config = paths
        .load_config()
        .with_context(|| format!("Failed to load {}", paths.config_file().display()))?;
    Ok((paths, config))
}

fn path_key(key: &str) -> Option<Browser> {
    key.strip_prefix("paths.").and_then(|b| b.parse().ok())
}

fn display_path(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string()).unwrap_or_default()
}

fn value_of(config: &Config, key: &str) -> Result<String> {
    let value = match key {
        "sync.debug_mode" => config.sync.debug_mode.to_string(),
        "watcher.debounce_ms" => config.watcher.debounce_ms.to_string(),
        "watcher.suppress_ms" => config.watcher.suppress_ms.to_string(),
        "backup.keep" => config.backup.keep.to_string(),
        "chromium.verify_checksum" => config.chromium.verify_checksum.to_string(),
        _ => match path_key(key) {
            Some(browser) => display_path(config.paths.get(browser)),
            None => anyhow::bail!(
                "Unknown config key: {}. Use 'marksync config list' to see available keys.",
                key
            ),
        },
    };
    Ok(value)
}

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let (paths, config) = load()?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), paths.config_file().display().dimmed());

    let mut section = "";
    for &key in KEYS {
        let (head, name) = key.split_once('.').unwrap_or(("", key));
        if head != section {
            if !section.is_empty() {
                println!();
            }
            println!("{}", format!("[{}]", head).yellow());
            section = head;
        }
        let value = value_of(&config, key)?;
        if value.is_empty() {
            println!("  {} = {}", name.cyan(), "(auto-detect)".dimmed());
        } else {
            println!("  {} = {}", name.cyan(), value);
        }
    }

    println!("\n{}", "Valid Ranges:".bold());
    println!("  watcher.debounce_ms: 10-5000");
    println!("  watcher.suppress_ms: 0-10000");
    println!("  backup.keep: 0 = keep everything");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let (_, config) = load()?;
    println!("{}", value_of(&config, key)?);
    Ok(())
}

/// Set a configuration value; an empty path unsets it
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let (paths, mut config) = load()?;

    match key {
        "sync.debug_mode" => {
            config.sync.debug_mode = value.parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        "watcher.debounce_ms" => {
            config.watcher.debounce_ms = value.parse()
                .context("Invalid value: must be a positive integer")?;
        }
        "watcher.suppress_ms" => {
            config.watcher.suppress_ms = value.parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "backup.keep" => {
            config.backup.keep = value.parse()
                .context("Invalid value: must be a non-negative integer")?;
        }
        "chromium.verify_checksum" => {
            config.chromium.verify_checksum = value.parse()
                .context("Invalid value: must be 'true' or 'false'")?;
        }
        _ => match path_key(key) {
            Some(browser) => {
                let path = (!value.is_empty()).then(|| PathBuf::from(value));
                config.paths.set(browser, path);
            }
            None => anyhow::bail!(
                "Unknown config key: {}. Use 'marksync config list' to see available keys.",
                key
            ),
        },
    }

    // Validate before saving
    config.validate()
        .context("Invalid configuration value")?;

    paths.save_config(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let paths = AppPaths::discover().context("Failed to locate marksync home")?;
    let config_path = paths.config_file();

    if create && !config_path.exists() {
        paths.init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else if config_path.exists() {
        println!("{}", config_path.display());
    } else {
        println!("{}", config_path.display());
        println!("{}", "File does not exist. Use --create to create it.".yellow());
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", example_config());
    Ok(())
}
