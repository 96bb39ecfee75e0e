//! # Treemail — periodic "what changed" digests for genealogy trees
//!
//! Builds a windowed digest of record edits, upcoming anniversaries,
//! and announcements per tree, and mails it to the configured
//! recipients.
//!
//! Usage:
//!   treemail cron                        # Send if due (for crontab)
//!   treemail send                        # Force a send now
//!   treemail get                         # Current digest as JSON
//!   treemail html                        # Current digest as HTML
//!   treemail image --tree demo --xref I1 # Portrait thumbnail

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use treemail_core::config::DigestSettings;
use treemail_store::TreemailDb;

mod ops;
mod render;

use ops::Operation;

#[derive(Parser)]
#[command(name = "treemail", version, about = "Periodic change-digest mailer for genealogy trees")]
pub struct Cli {
    /// Config file (default: ~/.treemail/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path (default: ~/.treemail/treemail.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    operation: Operation,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "treemail=debug,treemail_digest=debug,treemail_store=debug"
    } else {
        "treemail=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    // One immutable settings snapshot for the whole run.
    let settings = match &cli.config {
        Some(path) => DigestSettings::load_from(path)?,
        None => DigestSettings::load()?,
    };

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| DigestSettings::home_dir().join("treemail.db"));
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = TreemailDb::open(&db_path, &settings.base_url)?;

    cli.operation.run(&settings, &db)
}
