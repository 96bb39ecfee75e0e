//! Trees, users, record resolution, visibility, and portraits.

use rusqlite::OptionalExtension;

use treemail_core::error::{Result, TreemailError};
use treemail_core::traits::{EntityResolver, MediaFile, Thumbnailer, TreeSource, UserSource};
use treemail_core::types::{AccessLevel, Entity, EntityKind, Tree, User, ViewContext};

use crate::db::TreemailDb;

impl TreeSource for TreemailDb {
    fn list_trees(&self) -> Result<Vec<Tree>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT gedcom_id, gedcom_name, title FROM gedcom ORDER BY gedcom_name")
            .map_err(|e| TreemailError::Store(format!("Tree list: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Tree {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    title: row.get(2)?,
                })
            })
            .map_err(|e| TreemailError::Store(format!("Tree list: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TreemailError::Store(format!("Tree row: {e}")))
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        real_name: row.get(2)?,
        email: row.get(3)?,
        language: row.get(4)?,
    })
}

impl UserSource for TreemailDb {
    fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT user_id, user_name, real_name, email, language
                 FROM user ORDER BY user_name",
            )
            .map_err(|e| TreemailError::Store(format!("User list: {e}")))?;
        let rows = stmt
            .query_map([], user_from_row)
            .map_err(|e| TreemailError::Store(format!("User list: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TreemailError::Store(format!("User row: {e}")))
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.conn()
            .query_row(
                "SELECT user_id, user_name, real_name, email, language
                 FROM user WHERE user_name = ?1",
                [username],
                user_from_row,
            )
            .optional()
            .map_err(|e| TreemailError::Store(format!("User lookup: {e}")))
    }
}

impl TreemailDb {
    /// Access level `username` holds on `tree`. Public when the user is
    /// not a member of the tree (or does not exist).
    fn access_level(&self, tree: &Tree, username: &str) -> AccessLevel {
        let role: Option<String> = self
            .conn()
            .query_row(
                "SELECT a.role
                 FROM tree_access a
                 JOIN user u ON u.user_id = a.user_id
                 WHERE a.gedcom_id = ?1 AND u.user_name = ?2",
                rusqlite::params![tree.id, username],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or_default();
        match role {
            Some(r) => AccessLevel::from_str(&r),
            None => AccessLevel::Public,
        }
    }

    fn spouses(&self, tree: &Tree, fam_xref: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn()
            .prepare(
                "SELECT spouse_xref FROM family_spouse
                 WHERE gedcom_id = ?1 AND fam_xref = ?2
                 ORDER BY ord",
            )
            .map_err(|e| TreemailError::Store(format!("Spouse query: {e}")))?;
        let rows = stmt
            .query_map(rusqlite::params![tree.id, fam_xref], |row| row.get(0))
            .map_err(|e| TreemailError::Store(format!("Spouse query: {e}")))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TreemailError::Store(format!("Spouse row: {e}")))
    }
}

impl EntityResolver for TreemailDb {
    fn resolve(&self, tree: &Tree, xref: &str, payload: Option<&str>) -> Result<Option<Entity>> {
        // A change whose new payload is empty is a deletion; there is
        // nothing left to show.
        if payload == Some("") {
            return Ok(None);
        }

        let row: Option<(String, String, String, bool)> = self
            .conn()
            .query_row(
                "SELECT tag, full_name, restriction, deceased
                 FROM record WHERE gedcom_id = ?1 AND xref = ?2",
                rusqlite::params![tree.id, xref],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get::<_, i64>(3)? != 0,
                    ))
                },
            )
            .optional()
            .map_err(|e| TreemailError::Store(format!("Record lookup: {e}")))?;

        let Some((tag, full_name, restriction, deceased)) = row else {
            return Ok(None);
        };
        let Some(kind) = EntityKind::from_tag(&tag) else {
            tracing::warn!(xref, tag, "Skipping record with unknown tag");
            return Ok(None);
        };

        let spouses = if kind == EntityKind::Family {
            self.spouses(tree, xref)?
        } else {
            Vec::new()
        };

        Ok(Some(Entity {
            kind,
            xref: xref.to_string(),
            name: full_name,
            url: format!("{}/tree/{}/{}/{xref}", self.base_url(), tree.name, tag),
            restriction: AccessLevel::from_str(&restriction),
            deceased,
            spouses,
        }))
    }

    fn is_visible(&self, tree: &Tree, entity: &Entity, viewer: &ViewContext) -> bool {
        let level = match viewer {
            ViewContext::Anonymous => AccessLevel::Public,
            ViewContext::Recipient(username) => self.access_level(tree, username),
        };
        entity.restriction <= level
    }

    fn portrait(&self, tree: &Tree, xref: &str) -> Result<Option<MediaFile>> {
        let row: Option<(Option<String>, Option<String>)> = self
            .conn()
            .query_row(
                "SELECT portrait_path, portrait_mime
                 FROM record WHERE gedcom_id = ?1 AND xref = ?2",
                rusqlite::params![tree.id, xref],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| TreemailError::Store(format!("Portrait lookup: {e}")))?;

        Ok(match row {
            Some((Some(path), Some(mime))) => Some(MediaFile { path, mime }),
            _ => None,
        })
    }
}

/// Filesystem-backed thumbnail source.
///
/// Portrait files on disk are pre-generated at thumbnail size, so a
/// render is a plain read; the requested dimensions are what the
/// generator used. A missing or unreadable file yields `Ok(None)` and
/// the digest simply omits the portrait.
pub struct FsThumbnailer;

impl Thumbnailer for FsThumbnailer {
    fn render(&self, media: &MediaFile, _width: u32, _height: u32) -> Result<Option<Vec<u8>>> {
        match std::fs::read(&media.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                tracing::warn!(path = %media.path, "Portrait file unreadable: {e}");
                Ok(None)
            }
        }
    }
}
