use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::{
    Database, OwnerScope, SearchOptions, SyncReport, Tag, TagConfig, TagCount, TagCountOptions,
    TagFrequencyAggregator, TagId, TagInput, TagList, TagListHandle, TagSynchronizer,
    TaggableId, TaggableKind, TaggableRef, TaggedSearchQueryBuilder, Tagging, TaggingError,
    TaggingId, error::Result,
};

/// Service layer providing tagging operations.
///
/// TaggingService owns a Database instance and a [`TagConfig`], and ties the
/// parser, the query builders and the synchronizer to storage. Taggable
/// entity tables belong to the host application; the service reads and
/// writes them only through [`TaggableKind`] descriptors.
///
/// # Examples
///
/// ```
/// use taggable::{Database, TaggingService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = TaggingService::new(db);
/// assert_eq!(service.config().delimiter, ",");
/// # Ok(())
/// # }
/// ```
pub struct TaggingService {
    db: Database,
    config: TagConfig,
}

impl TaggingService {
    /// Creates a new TaggingService with the given database and the default
    /// configuration.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: TagConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: TagConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    /// Parses text with the configured delimiter.
    pub fn parse<'a>(&self, text: impl Into<Option<&'a str>>) -> TagList {
        TagList::parse(text, &self.config.delimiter)
    }

    /// Formats a list with the configured delimiter.
    pub fn format(&self, list: &TagList) -> String {
        list.to_delimited(&self.config.delimiter)
    }

    /// Looks up a tag by name, ignoring case.
    pub fn find_tag(&self, name: &str) -> Result<Option<Tag>> {
        let tag = self
            .db
            .connection()
            .query_row(
                "SELECT id, name FROM tags WHERE name = ?1 COLLATE NOCASE",
                [name.trim()],
                |row| Ok(Tag::new(TagId::new(row.get(0)?), row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(tag)
    }

    /// Finds a tag by name ignoring case, creating it when absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::{Database, TaggingService};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = TaggingService::new(Database::in_memory()?);
    ///
    /// let id = service.find_or_create_tag("Nature")?;
    /// assert_eq!(service.find_or_create_tag("NATURE")?, id);
    /// assert!(service.find_or_create_tag("   ").is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn find_or_create_tag(&self, name: &str) -> Result<TagId> {
        TagSynchronizer::new(self.db.connection()).find_or_create_tag(name)
    }

    /// Links one tag to one taggable. Returns false if the link already existed.
    pub fn tag(&self, tag_id: TagId, taggable: TaggableRef) -> Result<bool> {
        TagSynchronizer::new(self.db.connection()).attach(tag_id, taggable)
    }

    /// Lists every taggable carrying `tag_id` whose type is one of `kinds`.
    ///
    /// Taggings of types not listed in `kinds` are skipped.
    pub fn tagged(&self, tag_id: TagId, kinds: &[TaggableKind]) -> Result<Vec<TaggableRef>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT taggable_type, taggable_id FROM taggings WHERE tag_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([tag_id.get()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut taggables = Vec::with_capacity(rows.len());
        for (type_name, id) in rows {
            match kinds.iter().find(|kind| kind.type_name == type_name) {
                Some(kind) => taggables.push(kind.entity(id)),
                None => debug!(%tag_id, type_name = %type_name, "skipping tagging of unknown kind"),
            }
        }
        Ok(taggables)
    }

    /// Returns the tags attached to `taggable`, oldest tagging first.
    pub fn tags_for(&self, taggable: TaggableRef) -> Result<Vec<Tag>> {
        TagSynchronizer::new(self.db.connection()).current_tags(taggable)
    }

    /// Returns the tagging rows of `taggable`, oldest first.
    pub fn taggings_for(&self, taggable: TaggableRef) -> Result<Vec<Tagging>> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, tag_id, created_at FROM taggings
             WHERE taggable_type = ?1 AND taggable_id = ?2
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![taggable.kind.type_name, taggable.id.get()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, tag_id, created_at)| {
                Ok(Tagging {
                    id: TaggingId::new(id),
                    tag_id: TagId::new(tag_id),
                    taggable,
                    created_at: OffsetDateTime::from_unix_timestamp(created_at)?,
                })
            })
            .collect()
    }

    /// Reconciles the stored tags of `taggable` with `pending` in one
    /// transaction.
    ///
    /// `None` means no change was requested and does nothing. `Some` of a
    /// blank list removes every tag. When the kind declares a cached tag list
    /// column it is rewritten in the same transaction.
    pub fn reconcile(&self, taggable: TaggableRef, pending: Option<&TagList>) -> Result<SyncReport> {
        let Some(desired) = pending else {
            debug!(%taggable, "no pending tag list");
            return Ok(SyncReport::default());
        };

        self.db
            .immediate_transaction(|conn| self.write_tag_list(conn, taggable, desired))
    }

    /// Saves the host entity and its pending tag list atomically.
    ///
    /// Runs `save` (the host's own write of the entity row), the cache column
    /// refresh and the reconciliation inside one transaction. On success the
    /// pending list is consumed and the memoized read is dropped so the next
    /// [`TaggingService::tag_list`] sees storage. On failure everything rolls
    /// back and the pending list stays on the handle.
    ///
    /// # Errors
    ///
    /// [`TaggingError::Save`] wraps an error returned by `save`; reconciliation
    /// errors are returned as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::{Database, TagListHandle, TaggableKind, TaggingService};
    ///
    /// const POST: TaggableKind = TaggableKind::new("Post", "posts");
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = TaggingService::new(Database::in_memory()?);
    /// service
    ///     .database()
    ///     .connection()
    ///     .execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT)")?;
    ///
    /// let mut post = TagListHandle::new(POST.entity(1));
    /// post.set_tag_list_text("Nature, \"Very good\"", ",");
    ///
    /// service.save_tag_list(&mut post, |conn| {
    ///     conn.execute("INSERT INTO posts (id, title) VALUES (1, 'Hello')", [])?;
    ///     Ok(())
    /// })?;
    ///
    /// assert_eq!(service.tag_list(&mut post)?.to_string(), "Nature, Very good");
    /// # Ok(())
    /// # }
    /// ```
    pub fn save_tag_list<F>(&self, handle: &mut TagListHandle, save: F) -> Result<SyncReport>
    where
        F: FnOnce(&Connection) -> anyhow::Result<()>,
    {
        let taggable = handle.taggable();
        let pending = handle.take_pending();

        let result = self.db.immediate_transaction(|conn| {
            save(conn).map_err(TaggingError::Save)?;
            match &pending {
                Some(desired) => self.write_tag_list(conn, taggable, desired),
                None => Ok(SyncReport::default()),
            }
        });

        match result {
            Ok(report) => {
                handle.reload();
                Ok(report)
            }
            Err(e) => {
                warn!(%taggable, error = %e, "tag list save rolled back");
                if let Some(list) = pending {
                    handle.restore_pending(list);
                }
                Err(e)
            }
        }
    }

    fn write_tag_list(
        &self,
        conn: &Connection,
        taggable: TaggableRef,
        desired: &TagList,
    ) -> Result<SyncReport> {
        if let Some(column) = taggable.kind.cached_tag_list_column {
            let sql = format!(
                "UPDATE {} SET {} = ?1 WHERE {} = ?2",
                taggable.kind.table, column, taggable.kind.primary_key
            );
            conn.execute(&sql, params![self.format(desired), taggable.id.get()])?;
        }

        let report = TagSynchronizer::new(conn).apply(taggable, desired)?;
        info!(
            %taggable,
            tags = %self.format(desired),
            "saved tag list"
        );
        Ok(report)
    }

    /// Returns the current tag list of a taggable.
    ///
    /// Resolution order: the pending list, the memoized read, the cached tag
    /// list column when populated, and finally the tags joined from storage.
    /// Reads from storage are memoized on the handle until
    /// [`TagListHandle::reload`].
    pub fn tag_list(&self, handle: &mut TagListHandle) -> Result<TagList> {
        if let Some(pending) = handle.pending() {
            return Ok(pending.clone());
        }
        if let Some(loaded) = handle.loaded() {
            return Ok(loaded.clone());
        }

        let taggable = handle.taggable();
        let list = match self.cached_tag_list(taggable)? {
            Some(text) => {
                debug!(%taggable, "tag list read from cache column");
                self.parse(text.as_str())
            }
            None => self
                .tags_for(taggable)?
                .iter()
                .map(Tag::name)
                .collect::<TagList>(),
        };

        handle.remember(list.clone());
        Ok(list)
    }

    /// Returns the current tag list formatted with the configured delimiter.
    pub fn tag_list_text(&self, handle: &mut TagListHandle) -> Result<String> {
        let list = self.tag_list(handle)?;
        Ok(self.format(&list))
    }

    /// Reads the cached tag list column; `None` when absent, NULL or blank.
    fn cached_tag_list(&self, taggable: TaggableRef) -> Result<Option<String>> {
        let Some(column) = taggable.kind.cached_tag_list_column else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            column, taggable.kind.table, taggable.kind.primary_key
        );
        let text: Option<Option<String>> = self
            .db
            .connection()
            .query_row(&sql, [taggable.id.get()], |row| row.get(0))
            .optional()?;

        Ok(text.flatten().filter(|t| !t.trim().is_empty()))
    }

    /// Finds the primary keys of `kind` entities matching `tags`.
    ///
    /// Text input is parsed with the configured delimiter. An empty tag set
    /// matches nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::{Database, SearchOptions, TaggableKind, TaggingService, TagList};
    ///
    /// const PHOTO: TaggableKind = TaggableKind::new("Photo", "photos");
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let service = TaggingService::new(Database::in_memory()?);
    /// service
    ///     .database()
    ///     .connection()
    ///     .execute_batch("CREATE TABLE photos (id INTEGER PRIMARY KEY)")?;
    /// for (id, tags) in [(1, "Nature, Animal"), (2, "Nature")] {
    ///     service.database().connection().execute("INSERT INTO photos (id) VALUES (?1)", [id])?;
    ///     service.reconcile(PHOTO.entity(id), Some(&TagList::parse(tags, ",")))?;
    /// }
    ///
    /// let any = service.find_tagged_with(PHOTO, "nature", SearchOptions::default())?;
    /// assert_eq!(any.len(), 2);
    ///
    /// let all = service.find_tagged_with(PHOTO, "Nature, Animal", SearchOptions::default().match_all())?;
    /// assert_eq!(all.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn find_tagged_with(
        &self,
        kind: TaggableKind,
        tags: impl Into<TagInput>,
        options: SearchOptions,
    ) -> Result<Vec<TaggableId>> {
        let plan = TaggedSearchQueryBuilder::with_config(kind, self.config.clone())
            .build(tags, options)?;
        self.db.execute_search(&plan)
    }

    /// Counts taggings per tag for one kind.
    pub fn tag_counts(&self, kind: TaggableKind, options: &TagCountOptions) -> Result<Vec<TagCount>> {
        let spec = TagFrequencyAggregator::new(kind).build(options, None);
        self.db.execute_tag_counts(&spec)
    }

    /// Counts taggings per tag for the taggables of one owner, e.g. the posts
    /// of one user.
    pub fn tag_counts_for_owner(
        &self,
        kind: TaggableKind,
        scope: OwnerScope,
        options: &TagCountOptions,
    ) -> Result<Vec<TagCount>> {
        let spec = TagFrequencyAggregator::new(kind).build(options, Some(scope));
        self.db.execute_tag_counts(&spec)
    }

    /// Deletes a taggable row together with its taggings.
    ///
    /// Returns the number of taggings removed.
    pub fn destroy_taggable(&self, taggable: TaggableRef) -> Result<usize> {
        self.db.immediate_transaction(|conn| {
            let removed = conn.execute(
                "DELETE FROM taggings WHERE taggable_type = ?1 AND taggable_id = ?2",
                params![taggable.kind.type_name, taggable.id.get()],
            )?;
            let sql = format!(
                "DELETE FROM {} WHERE {} = ?1",
                taggable.kind.table, taggable.kind.primary_key
            );
            conn.execute(&sql, [taggable.id.get()])?;

            info!(%taggable, taggings = removed, "destroyed taggable");
            Ok(removed)
        })
    }
}
