//! # Treemail Digest Engine
//! The aggregation and scheduling core: decides whether a run is due,
//! collects one window of record edits, upcoming anniversaries, and
//! announcements per tree, and drives the best-effort recipient
//! dispatch loop.
//!
//! ## Architecture
//! ```text
//! ScheduleClock (last/this/next send, due check)
//!   └── RunWindow
//!         ├── ChangeAggregator      (latest accepted edit per record)
//!         ├── AnniversaryAggregator (recurring dates, year independent)
//!         └── NewsAggregator       (announcements, ascending)
//!               └── DigestBuilder  (per tree, empty-tree suppression)
//!                     └── DispatchLoop (per recipient, failure isolated)
//! ```
//!
//! One invocation processes one bounded window, serially. Everything
//! here is pure or goes through the collaborator traits in
//! `treemail-core`; there is no I/O in this crate.

pub mod anniversaries;
pub mod builder;
pub mod changes;
pub mod dates;
pub mod dispatch;
pub mod model;
pub mod news;
pub mod schedule;

pub use anniversaries::AnniversaryAggregator;
pub use builder::DigestBuilder;
pub use changes::ChangeAggregator;
pub use dispatch::{DigestRenderer, DispatchLoop, RenderedMail};
pub use model::{
    AnniversaryEvent, ChangeRecord, Digest, DispatchReport, NewsItem, RunWindow, TreeDigest,
    WindowDates,
};
pub use news::NewsAggregator;
pub use schedule::ScheduleClock;
