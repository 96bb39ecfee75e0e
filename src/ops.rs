//! The supported operations and their dispatch.
//!
//! One enum, one exhaustive match. Adding an operation means adding a
//! variant; the compiler then points at every place that must handle
//! it, and the `help` output comes from the derive rather than a
//! hand-maintained list.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Subcommand;
use std::io::Write;
use std::path::PathBuf;

use treemail_core::config::DigestSettings;
use treemail_core::error::TreemailError;
use treemail_core::traits::{EntityResolver, Thumbnailer, TreeSource};
use treemail_core::types::{ImageMode, ViewContext};
use treemail_digest::anniversaries::PORTRAIT_SIZE;
use treemail_digest::{Digest, DigestBuilder, DispatchLoop, ScheduleClock, schedule};
use treemail_mailer::SmtpMailer;
use treemail_store::{FsThumbnailer, TreemailDb};

use crate::render::{self, HtmlRenderer};

#[derive(Debug, Subcommand)]
pub enum Operation {
    /// List every supported operation
    Help,
    /// Send the digest if a run is due, then advance the schedule
    Cron,
    /// Print the current digest as JSON (public records only)
    Get,
    /// Print the current digest as HTML (public records only)
    Html {
        /// Language for section headings, e.g. "fr"; defaults to English
        #[arg(long)]
        language: Option<String>,
    },
    /// Write an individual's portrait thumbnail
    Image {
        /// Tree name
        #[arg(long)]
        tree: String,
        /// Record reference, e.g. I123
        #[arg(long)]
        xref: String,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Force a dispatch now, regardless of the due check
    Send,
}

impl Operation {
    pub fn run(self, settings: &DigestSettings, db: &TreemailDb) -> Result<()> {
        match self {
            Operation::Help => {
                use clap::CommandFactory;
                crate::Cli::command().print_long_help()?;
                Ok(())
            }
            Operation::Cron => dispatch(settings, db, false),
            Operation::Send => dispatch(settings, db, true),
            Operation::Get => {
                let digest = build_public(settings, db)?;
                println!("{}", serde_json::to_string_pretty(&digest)?);
                Ok(())
            }
            Operation::Html { language } => {
                let digest = build_public(settings, db)?;
                print!(
                    "{}",
                    render::render_html(&digest, settings, language.as_deref().unwrap_or("en"))
                );
                Ok(())
            }
            Operation::Image { tree, xref, out } => image(settings, db, &tree, &xref, out),
        }
    }
}

/// Build the digest for anonymous eyes, for the read-only operations.
fn build_public(settings: &DigestSettings, db: &TreemailDb) -> Result<Digest> {
    let today = Local::now().date_naive();
    let window = ScheduleClock::new(db).window(today, settings.interval_days);
    let thumbnailer = FsThumbnailer;
    let builder = DigestBuilder {
        trees: db,
        changes: db,
        calendar: db,
        news: db,
        resolver: db,
        thumbnailer: &thumbnailer,
    };
    Ok(builder.build(settings, &window, &ViewContext::Anonymous)?)
}

/// One delivery pass. `force` bypasses the due check (the `send`
/// operation); either way the schedule advances only after the
/// recipient loop has run.
fn dispatch(settings: &DigestSettings, db: &TreemailDb, force: bool) -> Result<()> {
    let today = Local::now().date_naive();
    let clock = ScheduleClock::new(db);
    let window = clock.window(today, settings.interval_days);

    if !force && !schedule::is_due(window.this, today) {
        tracing::info!(due = %window.this, "Digest not due yet, nothing to do");
        println!("Not due until {}.", window.this);
        return Ok(());
    }

    let Some(smtp) = &settings.smtp else {
        bail!("No [smtp] section in the config; cannot deliver digests");
    };
    let mailer = SmtpMailer::new(smtp)?;
    let thumbnailer = FsThumbnailer;
    let builder = DigestBuilder {
        trees: db,
        changes: db,
        calendar: db,
        news: db,
        resolver: db,
        thumbnailer: &thumbnailer,
    };
    let report = DispatchLoop::new(builder, db, &HtmlRenderer, &mailer).send(settings, &window)?;
    clock.record_send(today)?;

    println!(
        "Sent {} digest(s), {} failed.",
        report.succeeded.len(),
        report.failed.len()
    );
    for username in &report.failed {
        println!("  failed: {username}");
    }
    Ok(())
}

/// Resolve an individual's portrait and emit the thumbnail bytes.
fn image(
    settings: &DigestSettings,
    db: &TreemailDb,
    tree_name: &str,
    xref: &str,
    out: Option<PathBuf>,
) -> Result<()> {
    if settings.image_mode == ImageMode::None {
        bail!("Image delivery is disabled (image_mode = \"none\")");
    }

    let tree = db
        .list_trees()?
        .into_iter()
        .find(|t| t.name == tree_name)
        .ok_or_else(|| TreemailError::UnknownTree(tree_name.to_string()))?;
    let media = db
        .portrait(&tree, xref)?
        .ok_or_else(|| TreemailError::UnknownRecord(xref.to_string()))?;
    let bytes = FsThumbnailer
        .render(&media, PORTRAIT_SIZE, PORTRAIT_SIZE)?
        .with_context(|| format!("Portrait file unreadable: {}", media.path))?;

    match out {
        Some(path) => std::fs::write(&path, &bytes)?,
        None => std::io::stdout().write_all(&bytes)?,
    }
    Ok(())
}
