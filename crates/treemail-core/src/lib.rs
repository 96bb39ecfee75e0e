//! # Treemail Core
//! Shared foundation for the digest mailer: configuration snapshot,
//! error type, domain types, and the collaborator traits the digest
//! engine is written against.
//!
//! The core never talks to SQLite or SMTP directly — `treemail-store`
//! and `treemail-mailer` implement the traits defined here.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{DigestSettings, SmtpSettings};
pub use error::{Result, TreemailError};
pub use types::{AccessLevel, Entity, EntityKind, EventKind, ImageMode, Tree, User, ViewContext};
