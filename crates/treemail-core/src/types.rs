//! Domain types shared across the workspace.
//!
//! Record and event kinds are closed sum types: every place that filters
//! on a tag or branches on a record shape matches exhaustively, instead
//! of comparing loose strings.

use serde::{Deserialize, Serialize};

/// Kind of a genealogical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "INDI")]
    Individual,
    #[serde(rename = "FAM")]
    Family,
    #[serde(rename = "OBJE")]
    Media,
    #[serde(rename = "NOTE")]
    Note,
    #[serde(rename = "SOUR")]
    Source,
    #[serde(rename = "SUBM")]
    Submitter,
    #[serde(rename = "REPO")]
    Repository,
    #[serde(rename = "_LOC")]
    Location,
}

impl EntityKind {
    /// GEDCOM record tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Individual => "INDI",
            Self::Family => "FAM",
            Self::Media => "OBJE",
            Self::Note => "NOTE",
            Self::Source => "SOUR",
            Self::Submitter => "SUBM",
            Self::Repository => "REPO",
            Self::Location => "_LOC",
        }
    }

    /// Parse a GEDCOM record tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "INDI" => Some(Self::Individual),
            "FAM" => Some(Self::Family),
            "OBJE" => Some(Self::Media),
            "NOTE" => Some(Self::Note),
            "SOUR" => Some(Self::Source),
            "SUBM" => Some(Self::Submitter),
            "REPO" => Some(Self::Repository),
            "_LOC" => Some(Self::Location),
            _ => None,
        }
    }

    /// All supported kinds, in display order.
    pub fn all() -> [Self; 8] {
        [
            Self::Individual,
            Self::Family,
            Self::Media,
            Self::Note,
            Self::Source,
            Self::Submitter,
            Self::Repository,
            Self::Location,
        ]
    }
}

/// Kind of a recurring calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "BIRT")]
    Birth,
    #[serde(rename = "DEAT")]
    Death,
    #[serde(rename = "MARR")]
    Marriage,
}

impl EventKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Birth => "BIRT",
            Self::Death => "DEAT",
            Self::Marriage => "MARR",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "BIRT" => Some(Self::Birth),
            "DEAT" => Some(Self::Death),
            "MARR" => Some(Self::Marriage),
            _ => None,
        }
    }
}

/// How portrait images are delivered inside the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ImageMode {
    /// No images at all.
    None,
    /// Inline `data:` URL with a base64 thumbnail.
    #[default]
    DataUrl,
    /// Authenticated link back to the `image` operation.
    Link,
}

/// Minimum access level required to see a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Visible to everyone, including anonymous digests.
    #[default]
    Public,
    /// Visible to authenticated tree members.
    Member,
    /// Visible to tree managers only.
    Manager,
}

impl AccessLevel {
    pub fn from_str(s: &str) -> Self {
        match s {
            "member" => Self::Member,
            "manager" => Self::Manager,
            _ => Self::Public,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Member => "member",
            Self::Manager => "manager",
        }
    }
}

/// Whose eyes a digest is built for.
///
/// Threaded explicitly through every resolution call; there is no
/// implicit "current user" anywhere in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewContext {
    /// Public digest (the `get`/`html` operations with no recipient).
    Anonymous,
    /// Digest scoped to one recipient, by username.
    Recipient(String),
}

/// An isolated genealogical dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub id: i64,
    pub name: String,
    pub title: String,
}

/// A registered user (digest recipient candidate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub real_name: String,
    pub email: String,
    /// BCP 47 language tag, e.g. "en" or "fr".
    pub language: String,
}

/// A resolved genealogical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub xref: String,
    pub name: String,
    pub url: String,
    /// Minimum access level required to see this record.
    pub restriction: AccessLevel,
    /// Known to be dead (individuals; always false otherwise).
    pub deceased: bool,
    /// Spouse xrefs, populated for Family records only.
    pub spouses: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_tag_round_trip() {
        for kind in EntityKind::all() {
            assert_eq!(EntityKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(EntityKind::from_tag("XXXX"), None);
    }

    #[test]
    fn image_mode_serde_names() {
        let json = serde_json::to_string(&ImageMode::DataUrl).unwrap();
        assert_eq!(json, "\"data-url\"");
        let back: ImageMode = serde_json::from_str("\"link\"").unwrap();
        assert_eq!(back, ImageMode::Link);
    }

    #[test]
    fn access_level_ordering() {
        assert!(AccessLevel::Public < AccessLevel::Member);
        assert!(AccessLevel::Member < AccessLevel::Manager);
    }
}
