//! # Treemail Store
//! SQLite implementations of the collaborator traits: trees, users,
//! change log, announcement store, calendar dates, record resolution,
//! and the persisted schedule state.
//!
//! One [`TreemailDb`] owns the connection and implements every store
//! trait, so a single instance can be handed to the digest engine as
//! each of its collaborators. All queries are inline and synchronous;
//! a digest run is one serial batch.

pub mod calendar;
pub mod changes;
pub mod db;
pub mod news;
pub mod records;
pub mod schedule;

pub use db::TreemailDb;
pub use records::FsThumbnailer;
