//! Treemail configuration system.
//!
//! One TOML file holds the digest settings and the SMTP transport
//! section. The file is read once at the start of a run into an
//! immutable [`DigestSettings`] snapshot; nothing re-reads preferences
//! mid-run. The persisted last-send date is deliberately *not* here —
//! it lives in the store and is written exactly once per completed run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TreemailError};
use crate::types::{EntityKind, EventKind, ImageMode};

/// Root configuration: one immutable snapshot per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSettings {
    /// Tree names to include. Empty = all trees.
    #[serde(default)]
    pub trees: Vec<String>,
    /// Recipient usernames. Empty = all users.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Keep trees whose every enabled category came back empty.
    #[serde(default)]
    pub show_empty: bool,
    /// Days between runs.
    #[serde(default = "default_interval_days")]
    pub interval_days: i64,
    /// How portrait images are delivered.
    #[serde(default)]
    pub image_mode: ImageMode,
    /// Base URL used when building record and image links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub news: NewsSettings,
    #[serde(default)]
    pub changes: ChangeSettings,
    #[serde(default)]
    pub anniversaries: AnniversarySettings,
    #[serde(default)]
    pub footer: FooterSettings,
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
}

fn default_interval_days() -> i64 {
    7
}
fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn bool_true() -> bool {
    true
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            trees: Vec::new(),
            recipients: Vec::new(),
            show_empty: false,
            interval_days: default_interval_days(),
            image_mode: ImageMode::default(),
            base_url: default_base_url(),
            news: NewsSettings::default(),
            changes: ChangeSettings::default(),
            anniversaries: AnniversarySettings::default(),
            footer: FooterSettings::default(),
            smtp: None,
        }
    }
}

/// Announcement section settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSettings {
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Change-list section settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSettings {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Record kinds to report.
    #[serde(default = "default_change_tags")]
    pub tags: Vec<EntityKind>,
}

fn default_change_tags() -> Vec<EntityKind> {
    vec![EntityKind::Individual, EntityKind::Family]
}

impl Default for ChangeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tags: default_change_tags(),
        }
    }
}

/// Anniversary section settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnniversarySettings {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Also report anniversaries of deceased individuals.
    #[serde(default)]
    pub include_deceased: bool,
    /// Event kinds to report.
    #[serde(default = "default_anniversary_tags")]
    pub tags: Vec<EventKind>,
}

fn default_anniversary_tags() -> Vec<EventKind> {
    vec![EventKind::Birth]
}

impl Default for AnniversarySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            include_deceased: false,
            tags: default_anniversary_tags(),
        }
    }
}

/// Mail footer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterSettings {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_footer_message")]
    pub message: String,
}

fn default_footer_message() -> String {
    "Sent by Treemail — the periodic digest for your family trees.".into()
}

impl Default for FooterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            message: default_footer_message(),
        }
    }
}

/// SMTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// From address, e.g. "Treemail <digest@example.org>".
    pub from: String,
    /// Reply-To address; defaults to a no-reply alias of `from`.
    #[serde(default)]
    pub reply_to: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl DigestSettings {
    /// Load settings from the default path (~/.treemail/config.toml).
    /// A missing file yields the documented defaults.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TreemailError::Config(format!("Failed to read config: {e}")))?;
        let settings: Self = toml::from_str(&content)
            .map_err(|e| TreemailError::Config(format!("Failed to parse config: {e}")))?;
        Ok(settings)
    }

    /// Save settings to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| TreemailError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Treemail home directory (~/.treemail).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".treemail")
    }

    /// Whether a tree name is in the configured selection.
    pub fn tree_selected(&self, name: &str) -> bool {
        self.trees.is_empty() || self.trees.iter().any(|t| t == name)
    }

    /// Whether a username is in the configured recipient selection.
    pub fn recipient_selected(&self, username: &str) -> bool {
        self.recipients.is_empty() || self.recipients.iter().any(|u| u == username)
    }
}
