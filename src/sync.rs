//! Reconciliation of stored taggings with a desired tag list.

use std::collections::HashSet;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::error::{Result, TaggingError};
use crate::models::{Tag, TagId, TagList, TaggableRef};

/// Attempts at find-or-create before giving up on a racing writer.
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Names added and removed by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl SyncReport {
    /// Returns true when nothing was written.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Makes the taggings of one entity equal a desired tag list.
///
/// Operates on a borrowed connection and never opens a transaction itself;
/// callers wrap it in one (see [`crate::Database::immediate_transaction`]).
pub struct TagSynchronizer<'c> {
    conn: &'c Connection,
    now: OffsetDateTime,
}

impl<'c> TagSynchronizer<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            now: OffsetDateTime::now_utc(),
        }
    }

    /// Stamps new taggings with `now` instead of the current time.
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = now;
        self
    }

    /// Returns the tags currently attached to `taggable`, oldest tagging first.
    pub fn current_tags(&self, taggable: TaggableRef) -> Result<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.name
             FROM taggings tg
             INNER JOIN tags t ON t.id = tg.tag_id
             WHERE tg.taggable_type = ?1 AND tg.taggable_id = ?2
             ORDER BY tg.id",
        )?;

        let tags = stmt
            .query_map(params![taggable.kind.type_name, taggable.id.get()], |row| {
                Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    /// Looks up a tag by name ignoring case without creating it.
    pub fn find_tag(&self, name: &str) -> Result<Option<TagId>> {
        let name = Tag::validate_name(name)?;
        let id = self
            .conn
            .query_row(
                "SELECT id FROM tags WHERE name = ?1 COLLATE NOCASE",
                [name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id.map(TagId::new))
    }

    /// Finds a tag by name ignoring case, creating it when absent.
    ///
    /// A unique violation on insert means another writer created the tag
    /// first; the lookup is retried a bounded number of times.
    ///
    /// # Errors
    ///
    /// [`TaggingError::InvalidTagName`] for blank names and
    /// [`TaggingError::TagConflict`] when retries are exhausted.
    pub fn find_or_create_tag(&self, name: &str) -> Result<TagId> {
        let name = Tag::validate_name(name)?;

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            if let Some(id) = self.find_tag(name)? {
                return Ok(id);
            }

            match self.conn.execute("INSERT INTO tags (name) VALUES (?1)", [name]) {
                Ok(_) => {
                    let id = TagId::new(self.conn.last_insert_rowid());
                    debug!(tag = name, %id, "created tag");
                    return Ok(id);
                }
                Err(e) => {
                    let err = TaggingError::from(e);
                    if !err.is_unique_violation() {
                        return Err(err);
                    }
                    debug!(tag = name, attempt, "tag created concurrently, retrying lookup");
                }
            }
        }

        Err(TaggingError::TagConflict {
            name: name.to_string(),
            attempts: MAX_CREATE_ATTEMPTS,
        })
    }

    /// Attaches a tag to `taggable`. Returns false if it was already attached.
    pub fn attach(&self, tag_id: TagId, taggable: TaggableRef) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO taggings (tag_id, taggable_id, taggable_type, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                tag_id.get(),
                taggable.id.get(),
                taggable.kind.type_name,
                self.now.unix_timestamp()
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Removes one tag from `taggable`.
    pub fn detach(&self, tag_id: TagId, taggable: TaggableRef) -> Result<()> {
        self.conn.execute(
            "DELETE FROM taggings WHERE tag_id = ?1 AND taggable_type = ?2 AND taggable_id = ?3",
            params![tag_id.get(), taggable.kind.type_name, taggable.id.get()],
        )?;
        Ok(())
    }

    /// Makes the tags of `taggable` equal `desired`.
    ///
    /// Desired names are resolved to existing tags ignoring case and the diff
    /// runs on tag ids, so a name that only differs in case from an attached
    /// tag keeps its tagging. Removals run before additions. Does no writes
    /// when the sets already match.
    pub fn apply(&self, taggable: TaggableRef, desired: &TagList) -> Result<SyncReport> {
        let current = self.current_tags(taggable)?;
        let current_ids: HashSet<TagId> = current.iter().map(Tag::id).collect();

        let mut kept = HashSet::new();
        let mut to_add = Vec::new();
        for name in desired.iter() {
            match self.find_tag(name)? {
                Some(id) if current_ids.contains(&id) => {
                    kept.insert(id);
                }
                _ => to_add.push(name),
            }
        }
        let to_remove: Vec<&Tag> = current
            .iter()
            .filter(|tag| !kept.contains(&tag.id()))
            .collect();

        if to_remove.is_empty() && to_add.is_empty() {
            debug!(%taggable, "tag list unchanged");
            return Ok(SyncReport::default());
        }

        let mut report = SyncReport::default();

        for tag in to_remove {
            self.detach(tag.id(), taggable)?;
            report.removed.push(tag.name().to_string());
        }

        let mut attached = HashSet::new();
        for name in to_add {
            let tag_id = self.find_or_create_tag(name)?;
            if attached.insert(tag_id) && self.attach(tag_id, taggable)? {
                report.added.push(name.clone());
            }
        }

        info!(
            %taggable,
            added = report.added.len(),
            removed = report.removed.len(),
            "reconciled tags"
        );
        Ok(report)
    }
}
