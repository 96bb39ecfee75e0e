//! Plain HTML/text rendering of a digest, with locale-aware subjects.
//!
//! Presentation only: the digest arrives fully aggregated and filtered.
//! Translation catalogs are not in scope; a small subject table covers
//! the supported recipient languages and everything else falls back to
//! English.

use treemail_core::config::DigestSettings;
use treemail_core::types::User;
use treemail_digest::{Digest, DigestRenderer, RenderedMail, TreeDigest};

/// Renders the digest into a multipart mail body.
pub struct HtmlRenderer;

impl DigestRenderer for HtmlRenderer {
    fn render(
        &self,
        digest: &Digest,
        settings: &DigestSettings,
        user: &User,
    ) -> Option<RenderedMail> {
        if digest.is_empty() {
            return None;
        }
        Some(RenderedMail {
            subject: subject(&user.language, settings.interval_days),
            text: render_text(digest, settings),
            html: render_html(digest, settings, &user.language),
        })
    }
}

/// Primary language subtag, region stripped.
fn lang_root(language: &str) -> &str {
    language.split(['-', '_']).next().unwrap_or("en")
}

/// Localized subject line with plural handling.
pub fn subject(language: &str, interval_days: i64) -> String {
    match (lang_root(language), interval_days) {
        ("fr", 1) => "Modifications du dernier jour".to_string(),
        ("fr", n) => format!("Modifications des {n} derniers jours"),
        ("de", 1) => "Änderungen des letzten Tages".to_string(),
        ("de", n) => format!("Änderungen der letzten {n} Tage"),
        (_, 1) => "Changes in the last day".to_string(),
        (_, n) => format!("Changes in the last {n} days"),
    }
}

/// Section headings `[news, changes, anniversaries]` per language.
fn headings(language: &str) -> [&'static str; 3] {
    match lang_root(language) {
        "fr" => ["Nouvelles", "Modifications", "Anniversaires"],
        "de" => ["Neuigkeiten", "Änderungen", "Jahrestage"],
        _ => ["News", "Changes", "Anniversaries"],
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Plain-text alternative body.
pub fn render_text(digest: &Digest, settings: &DigestSettings) -> String {
    let mut out = String::new();
    for (tree_name, tree) in &digest.trees {
        out.push_str(&format!("== {tree_name} ==\n"));
        out.push_str(&format!(
            "Period: {} to {}\n\n",
            tree.dates.this, tree.dates.next
        ));

        if let Some(news) = &tree.news {
            for item in news {
                out.push_str(&format!("[news] {}: {}\n", item.timestamp.date(), item.subject));
            }
            if !news.is_empty() {
                out.push('\n');
            }
        }
        if let Some(changes) = &tree.changes {
            for (day, records) in changes {
                for r in records {
                    out.push_str(&format!("[changed] {day} {} by {}\n  {}\n", r.name, r.actor, r.url));
                }
            }
            if !changes.is_empty() {
                out.push('\n');
            }
        }
        if let Some(anniversaries) = &tree.anniversaries {
            for events in anniversaries.values() {
                for e in events {
                    out.push_str(&format!(
                        "[{}] {} {} ({} years)\n  {}\n",
                        e.event.tag(),
                        e.date,
                        e.name,
                        e.age,
                        e.url
                    ));
                }
            }
        }
        out.push('\n');
    }
    if settings.footer.enabled {
        out.push_str(&settings.footer.message);
        out.push('\n');
    }
    out
}

/// HTML body, with section headings in the given language.
pub fn render_html(digest: &Digest, settings: &DigestSettings, language: &str) -> String {
    let headings = headings(language);
    let mut out = String::from("<html><body>\n");
    for (tree_name, tree) in &digest.trees {
        out.push_str(&format!("<h2>{}</h2>\n", escape(tree_name)));
        out.push_str(&format!(
            "<p>{} &rarr; {}</p>\n",
            tree.dates.this, tree.dates.next
        ));
        render_tree_html(&mut out, tree, &headings);
    }
    if settings.footer.enabled {
        out.push_str(&format!("<hr><p>{}</p>\n", escape(&settings.footer.message)));
    }
    out.push_str("</body></html>\n");
    out
}

fn render_tree_html(out: &mut String, tree: &TreeDigest, headings: &[&str; 3]) {
    if let Some(news) = &tree.news
        && !news.is_empty()
    {
        out.push_str(&format!("<h3>{}</h3>\n<ul>\n", headings[0]));
        for item in news {
            out.push_str(&format!(
                "<li><b>{}</b> ({})<br>{}</li>\n",
                escape(&item.subject),
                item.timestamp.date(),
                escape(&item.body)
            ));
        }
        out.push_str("</ul>\n");
    }

    if let Some(changes) = &tree.changes
        && !changes.is_empty()
    {
        out.push_str(&format!("<h3>{}</h3>\n", headings[1]));
        for (day, records) in changes {
            out.push_str(&format!("<h4>{day}</h4>\n<ul>\n"));
            for r in records {
                out.push_str(&format!(
                    "<li><a href=\"{}\">{}</a> by {}</li>\n",
                    escape(&r.url),
                    escape(&r.name),
                    escape(&r.actor)
                ));
            }
            out.push_str("</ul>\n");
        }
    }

    if let Some(anniversaries) = &tree.anniversaries
        && !anniversaries.is_empty()
    {
        out.push_str(&format!("<h3>{}</h3>\n<ul>\n", headings[2]));
        for events in anniversaries.values() {
            for e in events {
                let portraits: String = e
                    .portraits
                    .iter()
                    .map(|p| format!("<img src=\"{}\" width=\"50\" height=\"50\"> ", escape(p)))
                    .collect();
                out.push_str(&format!(
                    "<li>{}{} <a href=\"{}\">{}</a> ({} years)</li>\n",
                    portraits,
                    e.date,
                    escape(&e.url),
                    escape(&e.name),
                    e.age
                ));
            }
        }
        out.push_str("</ul>\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;
    use treemail_core::types::{EntityKind, EventKind};
    use treemail_digest::{AnniversaryEvent, ChangeRecord, WindowDates};

    fn digest_with_one_change() -> Digest {
        let mut changes = BTreeMap::new();
        changes.insert(
            "2024-01-02".to_string(),
            vec![ChangeRecord {
                kind: EntityKind::Individual,
                xref: "I1".into(),
                name: "John <Doe>".into(),
                url: "http://example/I1".into(),
                timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                actor: "alice".into(),
            }],
        );
        let mut digest = Digest::default();
        digest.trees.insert(
            "demo".into(),
            TreeDigest {
                dates: WindowDates {
                    last: None,
                    this: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
                    next: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                },
                news: None,
                changes: Some(changes),
                anniversaries: None,
            },
        );
        digest
    }

    fn user(language: &str) -> User {
        User {
            id: 1,
            username: "alice".into(),
            real_name: "Alice".into(),
            email: "alice@example.org".into(),
            language: language.into(),
        }
    }

    #[test]
    fn subject_plural_per_locale() {
        assert_eq!(subject("en", 1), "Changes in the last day");
        assert_eq!(subject("en", 7), "Changes in the last 7 days");
        assert_eq!(subject("fr", 7), "Modifications des 7 derniers jours");
        assert_eq!(subject("de", 1), "Änderungen des letzten Tages");
        // Region subtags and unknown languages fall back sensibly.
        assert_eq!(subject("fr-CA", 1), "Modifications du dernier jour");
        assert_eq!(subject("nl", 3), "Changes in the last 3 days");
    }

    #[test]
    fn empty_digest_renders_to_nothing() {
        let renderer = HtmlRenderer;
        assert!(
            renderer
                .render(&Digest::default(), &DigestSettings::default(), &user("en"))
                .is_none()
        );
    }

    #[test]
    fn html_escapes_names_and_appends_footer() {
        let renderer = HtmlRenderer;
        let mail = renderer
            .render(
                &digest_with_one_change(),
                &DigestSettings::default(),
                &user("en"),
            )
            .unwrap();
        assert!(mail.html.contains("John &lt;Doe&gt;"));
        assert!(!mail.html.contains("John <Doe>"));
        assert!(mail.html.contains(&escape(&DigestSettings::default().footer.message)));
        assert!(mail.text.contains("John <Doe>"));
    }

    #[test]
    fn footer_can_be_disabled() {
        let settings = DigestSettings {
            footer: treemail_core::config::FooterSettings {
                enabled: false,
                message: "never shown".into(),
            },
            ..Default::default()
        };
        let html = render_html(&digest_with_one_change(), &settings, "en");
        assert!(!html.contains("never shown"));
    }

    #[test]
    fn section_headings_follow_the_language() {
        let digest = digest_with_one_change();
        let settings = DigestSettings::default();

        let fr = render_html(&digest, &settings, "fr");
        assert!(fr.contains("<h3>Modifications</h3>"));
        assert!(!fr.contains("<h3>Changes</h3>"));

        let de = render_html(&digest, &settings, "de-AT");
        assert!(de.contains("<h3>Änderungen</h3>"));

        // Unknown languages fall back to English.
        let nl = render_html(&digest, &settings, "nl");
        assert!(nl.contains("<h3>Changes</h3>"));
    }

    #[test]
    fn anniversaries_render_with_portraits() {
        let mut anniversaries = BTreeMap::new();
        anniversaries.insert(
            "-03-10".to_string(),
            vec![AnniversaryEvent {
                kind: EntityKind::Individual,
                xref: "I1".into(),
                event: EventKind::Birth,
                name: "Jane Doe".into(),
                url: "http://example/I1".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
                age: 44,
                portraits: vec!["data:image/jpeg;base64,AAAA".into()],
            }],
        );
        let mut digest = Digest::default();
        digest.trees.insert(
            "demo".into(),
            TreeDigest {
                dates: WindowDates {
                    last: None,
                    this: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
                    next: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                },
                news: None,
                changes: None,
                anniversaries: Some(anniversaries),
            },
        );
        let html = render_html(&digest, &DigestSettings::default(), "en");
        assert!(html.contains("data:image/jpeg;base64,AAAA"));
        assert!(html.contains("44 years"));
    }
}
