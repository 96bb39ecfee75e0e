//! Treemail error type.

use thiserror::Error;

/// Errors surfaced by Treemail components.
#[derive(Debug, Error)]
pub enum TreemailError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Unknown tree: {0}")]
    UnknownTree(String),

    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type used throughout Treemail.
pub type Result<T> = std::result::Result<T, TreemailError>;
