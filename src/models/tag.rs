use std::fmt;

use serde::{Deserialize, Serialize};

use super::TagId;
use crate::error::{Result, TaggingError};

/// A unique named label.
///
/// Two tags are equal when their names are equal; the ID is storage identity
/// and does not take part in comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    id: TagId,
    name: String,
}

impl Tag {
    /// Creates a tag from a stored row.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::{Tag, TagId};
    ///
    /// let tag = Tag::new(TagId::new(1), "Nature");
    /// assert_eq!(tag.id(), TagId::new(1));
    /// assert_eq!(tag.name(), "Nature");
    /// assert_eq!(tag.to_string(), "Nature");
    /// ```
    pub fn new(id: TagId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the tag's unique identifier.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns the tag name as stored.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trims a candidate tag name and rejects blank names.
    ///
    /// # Examples
    ///
    /// ```
    /// use taggable::Tag;
    ///
    /// assert_eq!(Tag::validate_name("  Nature ").unwrap(), "Nature");
    /// assert!(Tag::validate_name("   ").is_err());
    /// ```
    pub fn validate_name(name: &str) -> Result<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(TaggingError::InvalidTagName(name.to_string()));
        }
        Ok(trimmed)
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Tag {}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One row of a tag frequency aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    /// Tag identifier.
    pub tag_id: TagId,
    /// Tag name as stored.
    pub name: String,
    /// Number of matching taggings; always positive in aggregation results.
    pub count: u64,
}

impl TagCount {
    /// Creates a count row.
    pub fn new(tag_id: TagId, name: impl Into<String>, count: u64) -> Self {
        Self {
            tag_id,
            name: name.into(),
            count,
        }
    }

    /// Returns the counted tag.
    pub fn tag(&self) -> Tag {
        Tag::new(self.tag_id, self.name.clone())
    }
}
