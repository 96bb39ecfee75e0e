//! Recipient dispatch loop — best-effort batch with per-recipient
//! isolation.
//!
//! Each recipient gets a digest built under their own viewing context
//! (private records never leak into someone else's mail) and exactly
//! one delivery attempt. A failure is recorded and the loop moves on;
//! there is no retry and no rollback.

use treemail_core::config::DigestSettings;
use treemail_core::error::Result;
use treemail_core::traits::{Mailer, UserSource};
use treemail_core::types::{User, ViewContext};

use crate::builder::DigestBuilder;
use crate::model::{Digest, DispatchReport, RunWindow};

/// A fully rendered mail, ready for the transport.
#[derive(Debug, Clone)]
pub struct RenderedMail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Renders a digest for one recipient. `None` means "nothing to say"
/// and the recipient is skipped without counting as success or
/// failure. Presentation concerns (templates, translations) live
/// behind this seam.
pub trait DigestRenderer {
    fn render(
        &self,
        digest: &Digest,
        settings: &DigestSettings,
        user: &User,
    ) -> Option<RenderedMail>;
}

/// Drives one delivery pass over the configured recipients.
pub struct DispatchLoop<'a> {
    builder: DigestBuilder<'a>,
    users: &'a dyn UserSource,
    renderer: &'a dyn DigestRenderer,
    mailer: &'a dyn Mailer,
}

impl<'a> DispatchLoop<'a> {
    pub fn new(
        builder: DigestBuilder<'a>,
        users: &'a dyn UserSource,
        renderer: &'a dyn DigestRenderer,
        mailer: &'a dyn Mailer,
    ) -> Self {
        Self {
            builder,
            users,
            renderer,
            mailer,
        }
    }

    /// Send the digest to every selected recipient.
    ///
    /// Returns who succeeded and who failed; recipients whose digest
    /// rendered empty appear in neither list. Never aborts early: an
    /// error for one recipient is recorded and the next one is still
    /// attempted.
    pub fn send(&self, settings: &DigestSettings, window: &RunWindow) -> Result<DispatchReport> {
        let (from, reply_to) = sender_addresses(settings);
        let mut report = DispatchReport::default();

        for user in self.users.list_users()? {
            if !settings.recipient_selected(&user.username) {
                continue;
            }
            match self.send_one(settings, window, &user, &from, &reply_to) {
                Ok(Some(true)) => report.succeeded.push(user.username),
                Ok(Some(false)) => {
                    tracing::warn!(user = %user.username, "Digest delivery refused by transport");
                    report.failed.push(user.username);
                }
                Ok(None) => {
                    tracing::debug!(user = %user.username, "Empty digest, skipping");
                }
                Err(e) => {
                    tracing::warn!(user = %user.username, "Digest delivery failed: {e}");
                    report.failed.push(user.username);
                }
            }
        }

        tracing::info!(
            sent = report.succeeded.len(),
            failed = report.failed.len(),
            "Dispatch finished"
        );
        Ok(report)
    }

    /// One recipient: build, render, deliver. `Ok(None)` = skipped.
    fn send_one(
        &self,
        settings: &DigestSettings,
        window: &RunWindow,
        user: &User,
        from: &str,
        reply_to: &str,
    ) -> Result<Option<bool>> {
        let viewer = ViewContext::Recipient(user.username.clone());
        let digest = self.builder.build(settings, window, &viewer)?;
        let Some(mail) = self.renderer.render(&digest, settings, user) else {
            return Ok(None);
        };
        let ok = self
            .mailer
            .send(from, user, reply_to, &mail.subject, &mail.text, &mail.html)?;
        Ok(Some(ok))
    }
}

/// From / Reply-To addresses for the digest mail. Falls back to
/// site-local no-reply addresses when SMTP is not configured (the
/// transport impl decides whether that is fatal).
fn sender_addresses(settings: &DigestSettings) -> (String, String) {
    match &settings.smtp {
        Some(smtp) => (
            smtp.from.clone(),
            smtp.reply_to
                .clone()
                .unwrap_or_else(|| "no-reply@localhost".into()),
        ),
        None => ("treemail@localhost".into(), "no-reply@localhost".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::cell::RefCell;
    use treemail_core::error::TreemailError;
    use treemail_core::traits::{
        CalendarRow, CalendarSource, ChangeLogStore, ChangeRow, EntityResolver, MediaFile,
        NewsRow, NewsStore, Thumbnailer, TreeSource,
    };
    use treemail_core::types::{AccessLevel, Entity, EntityKind, EventKind, Tree};

    struct Fixture {
        users: Vec<User>,
        changes: Vec<ChangeRow>,
    }

    impl TreeSource for Fixture {
        fn list_trees(&self) -> Result<Vec<Tree>> {
            Ok(vec![Tree {
                id: 1,
                name: "demo".into(),
                title: "Demo".into(),
            }])
        }
    }

    impl UserSource for Fixture {
        fn list_users(&self) -> Result<Vec<User>> {
            Ok(self.users.clone())
        }
        fn find_by_username(&self, username: &str) -> Result<Option<User>> {
            Ok(self.users.iter().find(|u| u.username == username).cloned())
        }
    }

    impl ChangeLogStore for Fixture {
        fn query_accepted(
            &self,
            _tree: &Tree,
            start: NaiveDateTime,
            end: NaiveDateTime,
        ) -> Result<Vec<ChangeRow>> {
            Ok(self
                .changes
                .iter()
                .filter(|r| r.timestamp >= start && r.timestamp < end)
                .cloned()
                .collect())
        }
    }

    impl CalendarSource for Fixture {
        fn query_events(
            &self,
            _tree: &Tree,
            _start_md: u32,
            _end_md: u32,
            _tags: &[EventKind],
            _include_deceased: bool,
        ) -> Result<Vec<CalendarRow>> {
            Ok(vec![])
        }
    }

    impl NewsStore for Fixture {
        fn query(
            &self,
            _tree: &Tree,
            _start: NaiveDateTime,
            _end: NaiveDateTime,
        ) -> Result<Vec<NewsRow>> {
            Ok(vec![])
        }
    }

    impl EntityResolver for Fixture {
        fn resolve(
            &self,
            _tree: &Tree,
            xref: &str,
            _payload: Option<&str>,
        ) -> Result<Option<Entity>> {
            Ok(Some(Entity {
                kind: EntityKind::Individual,
                xref: xref.into(),
                name: xref.into(),
                url: format!("http://example/{xref}"),
                restriction: AccessLevel::Public,
                deceased: false,
                spouses: vec![],
            }))
        }
        fn is_visible(&self, _tree: &Tree, _entity: &Entity, _viewer: &ViewContext) -> bool {
            true
        }
        fn portrait(&self, _tree: &Tree, _xref: &str) -> Result<Option<MediaFile>> {
            Ok(None)
        }
    }

    impl Thumbnailer for Fixture {
        fn render(&self, _media: &MediaFile, _w: u32, _h: u32) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
    }

    struct PlainRenderer;

    impl DigestRenderer for PlainRenderer {
        fn render(
            &self,
            digest: &Digest,
            _settings: &DigestSettings,
            _user: &User,
        ) -> Option<RenderedMail> {
            if digest.is_empty() {
                return None;
            }
            Some(RenderedMail {
                subject: "digest".into(),
                text: "digest".into(),
                html: "<p>digest</p>".into(),
            })
        }
    }

    /// Mailer scripted per username: true/false/error.
    struct ScriptedMailer {
        outcomes: Vec<(&'static str, std::result::Result<bool, ()>)>,
        attempts: RefCell<Vec<String>>,
    }

    impl Mailer for ScriptedMailer {
        fn send(
            &self,
            _from: &str,
            to: &User,
            _reply_to: &str,
            _subject: &str,
            _text: &str,
            _html: &str,
        ) -> Result<bool> {
            self.attempts.borrow_mut().push(to.username.clone());
            match self
                .outcomes
                .iter()
                .find(|(name, _)| *name == to.username)
                .map(|(_, outcome)| outcome)
            {
                Some(Ok(ok)) => Ok(*ok),
                Some(Err(())) => Err(TreemailError::Mail("smtp down".into())),
                None => Ok(true),
            }
        }
    }

    fn user(name: &str) -> User {
        User {
            id: 1,
            username: name.into(),
            real_name: name.into(),
            email: format!("{name}@example.org"),
            language: "en".into(),
        }
    }

    fn change(day: u32) -> ChangeRow {
        ChangeRow {
            xref: "I1".into(),
            change_id: 1,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            actor: "alice".into(),
            payload: "0 @I1@ INDI".into(),
        }
    }

    fn window() -> RunWindow {
        RunWindow::for_schedule(
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            7,
        )
    }

    fn run(fixture: &Fixture, mailer: &ScriptedMailer, settings: &DigestSettings) -> DispatchReport {
        let builder = DigestBuilder {
            trees: fixture,
            changes: fixture,
            calendar: fixture,
            news: fixture,
            resolver: fixture,
            thumbnailer: fixture,
        };
        DispatchLoop::new(builder, fixture, &PlainRenderer, mailer)
            .send(settings, &window())
            .unwrap()
    }

    #[test]
    fn failure_of_one_recipient_does_not_stop_the_next() {
        let fixture = Fixture {
            users: vec![user("alice"), user("bob")],
            changes: vec![change(3)],
        };
        let mailer = ScriptedMailer {
            outcomes: vec![("alice", Err(())), ("bob", Ok(true))],
            attempts: RefCell::new(vec![]),
        };
        let report = run(&fixture, &mailer, &DigestSettings::default());

        assert_eq!(report.failed, vec!["alice"]);
        assert_eq!(report.succeeded, vec!["bob"]);
        assert_eq!(*mailer.attempts.borrow(), vec!["alice", "bob"]);
    }

    #[test]
    fn false_transport_result_counts_as_failure() {
        let fixture = Fixture {
            users: vec![user("carol")],
            changes: vec![change(3)],
        };
        let mailer = ScriptedMailer {
            outcomes: vec![("carol", Ok(false))],
            attempts: RefCell::new(vec![]),
        };
        let report = run(&fixture, &mailer, &DigestSettings::default());
        assert_eq!(report.failed, vec!["carol"]);
        assert!(report.succeeded.is_empty());
    }

    #[test]
    fn empty_digest_skips_without_counting() {
        // No changes at all: the renderer returns None for everyone.
        let fixture = Fixture {
            users: vec![user("alice")],
            changes: vec![],
        };
        let mailer = ScriptedMailer {
            outcomes: vec![],
            attempts: RefCell::new(vec![]),
        };
        let report = run(&fixture, &mailer, &DigestSettings::default());
        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
        assert!(mailer.attempts.borrow().is_empty());
    }

    #[test]
    fn recipient_selection_restricts_the_loop() {
        let fixture = Fixture {
            users: vec![user("alice"), user("bob")],
            changes: vec![change(3)],
        };
        let mailer = ScriptedMailer {
            outcomes: vec![],
            attempts: RefCell::new(vec![]),
        };
        let settings = DigestSettings {
            recipients: vec!["bob".into()],
            ..Default::default()
        };
        let report = run(&fixture, &mailer, &settings);
        assert_eq!(report.succeeded, vec!["bob"]);
        assert_eq!(*mailer.attempts.borrow(), vec!["bob"]);
    }
}
