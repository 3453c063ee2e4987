use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TaggableRef;
use crate::config::DEFAULT_DELIMITER;
use crate::parser::{TagParser, normalize_names};

/// Ordered, deduplicated list of tag names.
///
/// Every name is trimmed and non-blank. Equality ignores order: two lists are
/// equal when they hold the same set of names.
///
/// # Examples
///
/// ```
/// use taggable::TagList;
///
/// let mut list = TagList::parse("Nature, \"Very good\"", ",");
/// list.add(["  Nature ", "Sky", ""]);
/// assert_eq!(list.names(), ["Very good", "Nature", "Sky"]);
///
/// list.remove(["Sky"]);
/// assert_eq!(list, TagList::from_names(["Nature", "Very good"]));
/// assert_eq!(list.to_string(), "Very good, Nature");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TagList {
    names: Vec<String>,
}

impl TagList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a list from raw names, normalizing them as [`TagList::add`] does.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        list.add(names);
        list
    }

    /// Parses delimited text into a list.
    pub fn parse<'a>(text: impl Into<Option<&'a str>>, delimiter: &str) -> Self {
        Self {
            names: TagParser::parse(text, delimiter),
        }
    }

    /// Appends names, trimming each, dropping blanks and keeping the first
    /// occurrence of duplicates.
    pub fn add<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let combined = std::mem::take(&mut self.names)
            .into_iter()
            .chain(names.into_iter().map(|name| name.as_ref().to_string()));
        self.names = normalize_names(combined);
    }

    /// Deletes every entry whose name is among `names`.
    pub fn remove<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let doomed: HashSet<String> = names
            .into_iter()
            .map(|name| name.as_ref().to_string())
            .collect();
        self.names.retain(|name| !doomed.contains(name));
    }

    /// Returns true when the list holds no names.
    pub fn is_blank(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if `name` is in the list (exact match).
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Returns the names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.names.iter()
    }

    /// Formats the list with an explicit delimiter.
    pub fn to_delimited(&self, delimiter: &str) -> String {
        TagParser::format(&self.names, delimiter)
    }
}

impl PartialEq for TagList {
    fn eq(&self, other: &Self) -> bool {
        let ours: HashSet<&str> = self.names.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.names.iter().map(String::as_str).collect();
        ours == theirs
    }
}

impl Eq for TagList {}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_delimited(DEFAULT_DELIMITER))
    }
}

impl FromStr for TagList {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s, DEFAULT_DELIMITER))
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}

impl From<Vec<String>> for TagList {
    fn from(names: Vec<String>) -> Self {
        Self::from_names(names)
    }
}

impl From<TagList> for Vec<String> {
    fn from(list: TagList) -> Self {
        list.names
    }
}

impl<'a> IntoIterator for &'a TagList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

/// In-memory tag state of one taggable entity.
///
/// Holds the pending desired list (set by the caller, consumed by
/// [`crate::TaggingService::save_tag_list`]) and the last list read from
/// storage. [`TagListHandle::reload`] discards both so the next read goes
/// back to storage.
#[derive(Debug, Clone)]
pub struct TagListHandle {
    taggable: TaggableRef,
    pending: Option<TagList>,
    loaded: Option<TagList>,
}

impl TagListHandle {
    pub fn new(taggable: TaggableRef) -> Self {
        Self {
            taggable,
            pending: None,
            loaded: None,
        }
    }

    pub fn taggable(&self) -> TaggableRef {
        self.taggable
    }

    /// Sets the desired tag list to be written on the next save.
    ///
    /// A blank list is a real request to remove every tag.
    pub fn set_tag_list(&mut self, list: TagList) {
        self.pending = Some(list);
    }

    /// Parses text and sets it as the desired tag list.
    pub fn set_tag_list_text<'a>(&mut self, text: impl Into<Option<&'a str>>, delimiter: &str) {
        self.set_tag_list(TagList::parse(text, delimiter));
    }

    /// Returns the pending desired list, if any.
    pub fn pending(&self) -> Option<&TagList> {
        self.pending.as_ref()
    }

    /// Forgets both the pending list and the memoized read.
    pub fn reload(&mut self) {
        self.pending = None;
        self.loaded = None;
    }

    pub(crate) fn loaded(&self) -> Option<&TagList> {
        self.loaded.as_ref()
    }

    pub(crate) fn remember(&mut self, list: TagList) {
        self.loaded = Some(list);
    }

    pub(crate) fn take_pending(&mut self) -> Option<TagList> {
        self.pending.take()
    }

    pub(crate) fn restore_pending(&mut self, list: TagList) {
        self.pending = Some(list);
    }
}
