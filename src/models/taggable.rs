use std::fmt;

use serde::Serialize;

use super::TaggableId;

/// Descriptor of one kind of entity that can carry tags.
///
/// `type_name` is what gets stored in `taggings.taggable_type`; `table` and
/// `primary_key` locate the entity's own rows. Descriptors are compile-time
/// constants, so their identifiers are trusted when rendered into SQL.
///
/// # Examples
///
/// ```
/// use taggable::TaggableKind;
///
/// const PHOTO: TaggableKind = TaggableKind::new("Photo", "photos")
///     .with_cached_tag_list("cached_tag_list");
///
/// assert_eq!(PHOTO.type_name, "Photo");
/// assert_eq!(PHOTO.primary_key, "id");
/// assert_eq!(PHOTO.cached_tag_list_column, Some("cached_tag_list"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaggableKind {
    /// Owner type recorded on each tagging.
    pub type_name: &'static str,
    /// Table holding the entity rows.
    pub table: &'static str,
    /// Primary key column of `table`.
    pub primary_key: &'static str,
    /// Optional denormalized tag list column on `table`.
    pub cached_tag_list_column: Option<&'static str>,
}

impl TaggableKind {
    /// Creates a descriptor with an `id` primary key and no cache column.
    pub const fn new(type_name: &'static str, table: &'static str) -> Self {
        Self {
            type_name,
            table,
            primary_key: "id",
            cached_tag_list_column: None,
        }
    }

    /// Overrides the primary key column.
    pub const fn with_primary_key(mut self, primary_key: &'static str) -> Self {
        self.primary_key = primary_key;
        self
    }

    /// Declares a denormalized tag list column.
    pub const fn with_cached_tag_list(mut self, column: &'static str) -> Self {
        self.cached_tag_list_column = Some(column);
        self
    }

    /// Refers to one entity of this kind.
    pub fn entity(self, id: i64) -> TaggableRef {
        TaggableRef::new(self, TaggableId::new(id))
    }
}

impl fmt::Display for TaggableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Reference to a single taggable entity: its kind plus its primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TaggableRef {
    pub kind: TaggableKind,
    pub id: TaggableId,
}

impl TaggableRef {
    /// Creates a reference.
    pub fn new(kind: TaggableKind, id: TaggableId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for TaggableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind.type_name, self.id)
    }
}

/// Restricts a tag count to taggables owned by one parent record.
///
/// Renders as `<taggable table>.<column> = owner_id`, e.g. only the posts of
/// one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OwnerScope {
    /// Foreign key column on the taggable's table.
    pub column: &'static str,
    /// Value the column must equal.
    pub owner_id: i64,
}

impl OwnerScope {
    pub fn new(column: &'static str, owner_id: i64) -> Self {
        Self { column, owner_id }
    }
}
