//! Marksync CLI - marksync command

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use marksync_core::Browser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod util;

/// Marksync - one bookmark collection, kept in step with every browser
#[derive(Parser)]
#[command(name = "marksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the marksync home directory, config and empty store
    Init,
    /// Show store and browser status
    Status,
    /// Print the bookmark tree
    List,
    /// Import bookmarks from browsers into the store
    Import {
        /// Browsers to import from (default: every installed browser)
        browsers: Vec<Browser>,
        /// Resolve title conflicts in favour of the browser's copy
        #[arg(long)]
        prefer_incoming: bool,
    },
    /// Replace browsers' bookmarks with the store
    Push {
        /// Browsers to overwrite
        #[arg(required = true)]
        browsers: Vec<Browser>,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Additive two-way sync with one browser
    Sync {
        /// Browser to sync with
        browser: Browser,
        /// Show the plan without applying it
        #[arg(long)]
        dry_run: bool,
        /// Confirm each action (overrides sync.debug_mode)
        #[arg(long, conflicts_with = "auto")]
        interactive: bool,
        /// Apply every action without asking (overrides sync.debug_mode)
        #[arg(long)]
        auto: bool,
    },
    /// Export the store to a portable file
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Load a portable file into the store
    Load {
        /// Previously exported file
        file: PathBuf,
        /// Merge into the store or replace it
        #[arg(long, value_enum, default_value = "merge")]
        mode: LoadMode,
        /// Resolve title conflicts in favour of the file's copy
        #[arg(long)]
        prefer_incoming: bool,
    },
    /// List backups, newest first
    Backups,
    /// Restore a browser's bookmark file from a backup
    Restore {
        /// Backup file name or path
        backup: String,
        /// Browser whose file is replaced
        browser: Browser,
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Watch the store file and reload on external changes
    Watch,
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Clone, Copy, ValueEnum)]
enum LoadMode {
    Merge,
    Overwrite,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value (e.g. watcher.debounce_ms)
    Get {
        key: String,
    },
    /// Set a value; an empty value clears a path override
    Set {
        key: String,
        value: String,
    },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example config
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cmd::init::run().await,
        Commands::Status => cmd::status::run().await,
        Commands::List => cmd::list::run().await,
        Commands::Import { browsers, prefer_incoming } => {
            cmd::import::run(browsers, prefer_incoming).await
        }
        Commands::Push { browsers, yes } => cmd::push::run(browsers, yes).await,
        Commands::Sync { browser, dry_run, interactive, auto } => {
            let interactive = if interactive {
                Some(true)
            } else if auto {
                Some(false)
            } else {
                None
            };
            cmd::sync::run(browser, dry_run, interactive).await
        }
        Commands::Export { file } => cmd::export::run(&file).await,
        Commands::Load { file, mode, prefer_incoming } => {
            let mode = match mode {
                LoadMode::Merge => marksync_ops::FileImportMode::Merge,
                LoadMode::Overwrite => marksync_ops::FileImportMode::Overwrite,
            };
            cmd::load::run(&file, mode, prefer_incoming).await
        }
        Commands::Backups => cmd::backups::run().await,
        Commands::Restore { backup, browser, yes } => cmd::restore::run(&backup, browser, yes).await,
        Commands::Watch => cmd::watch::run().await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
