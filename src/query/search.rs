use std::collections::HashSet;

use super::{CmpOp, Column, HavingCount, Join, Predicate, SubSelect, Table};
use crate::config::TagConfig;
use crate::error::{Result, TaggingError};
use crate::models::{Tag, TagList, TaggableKind};
use crate::parser::{TagParser, normalize_names};

/// Tags to search for, either as delimited text or as individual names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagInput {
    /// Parsed with the builder's delimiter.
    Text(String),
    /// Used as given after trimming; blank entries are dropped.
    Names(Vec<String>),
}

impl From<&str> for TagInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for TagInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for TagInput {
    fn from(names: Vec<String>) -> Self {
        Self::Names(names)
    }
}

impl From<Vec<&str>> for TagInput {
    fn from(names: Vec<&str>) -> Self {
        Self::Names(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for TagInput {
    fn from(names: &[&str]) -> Self {
        Self::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for TagInput {
    fn from(names: [&str; N]) -> Self {
        Self::Names(names.iter().map(|n| n.to_string()).collect())
    }
}

impl From<Vec<Option<String>>> for TagInput {
    fn from(names: Vec<Option<String>>) -> Self {
        Self::Names(names.into_iter().flatten().collect())
    }
}

impl From<&[Tag]> for TagInput {
    fn from(tags: &[Tag]) -> Self {
        Self::Names(tags.iter().map(|t| t.name().to_string()).collect())
    }
}

impl From<&TagList> for TagInput {
    fn from(list: &TagList) -> Self {
        Self::Names(list.names().to_vec())
    }
}

/// Options for a tagged search.
///
/// `exclude` and `match_all` are mutually exclusive; combining them is
/// rejected with [`TaggingError::Config`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOptions {
    /// Select entities carrying none of the tags.
    pub exclude: bool,
    /// Select entities carrying every tag instead of at least one.
    pub match_all: bool,
    /// Extra predicate ANDed into the final filter.
    pub conditions: Option<Predicate>,
}

impl SearchOptions {
    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn match_all(mut self) -> Self {
        self.match_all = true;
        self
    }

    pub fn conditions(mut self, predicate: Predicate) -> Self {
        self.conditions = Some(predicate);
        self
    }
}

/// Filter selecting the primary keys of matching taggable entities.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub kind: TaggableKind,
    /// Selected column; always the kind's primary key.
    pub select: Column,
    pub distinct: bool,
    pub joins: Vec<Join>,
    pub predicate: Predicate,
    pub group_by: Option<Column>,
    pub having: Option<HavingCount>,
}

/// Result of building a tagged search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPlan {
    /// The requested tag set was empty; the result is empty without querying.
    NoMatch,
    Filter(FilterSpec),
}

impl SearchPlan {
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch)
    }

    pub fn filter(&self) -> Option<&FilterSpec> {
        match self {
            Self::NoMatch => None,
            Self::Filter(spec) => Some(spec),
        }
    }
}

/// Builds filters selecting entities of one kind by tag membership.
///
/// All name comparisons are case-insensitive.
///
/// # Match-all precondition
///
/// `match_all` selects entities whose number of matching taggings equals the
/// number of requested names. That is exact only when the requested names are
/// distinct (the builder deduplicates them case-insensitively) and an entity
/// has at most one tagging per tag (enforced by a unique index in storage).
///
/// # Examples
///
/// ```
/// use taggable::{SearchOptions, TaggableKind, TaggedSearchQueryBuilder};
///
/// let photos = TaggedSearchQueryBuilder::new(TaggableKind::new("Photo", "photos"));
///
/// let plan = photos.build("Nature, \"Crazy animal\"", SearchOptions::default().match_all())?;
/// let filter = plan.filter().expect("non-empty tag set");
/// assert_eq!(filter.having.map(|h| h.value), Some(2));
///
/// assert!(photos.build("", SearchOptions::default())?.is_no_match());
/// assert!(photos.build("A", SearchOptions::default().exclude().match_all()).is_err());
/// # Ok::<(), taggable::TaggingError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TaggedSearchQueryBuilder {
    kind: TaggableKind,
    config: TagConfig,
}

impl TaggedSearchQueryBuilder {
    /// Creates a builder using the default delimiter.
    pub fn new(kind: TaggableKind) -> Self {
        Self::with_config(kind, TagConfig::default())
    }

    pub fn with_config(kind: TaggableKind, config: TagConfig) -> Self {
        Self { kind, config }
    }

    /// Builds the search plan for `tags` under `options`.
    ///
    /// # Errors
    ///
    /// Returns [`TaggingError::Config`] when `exclude` and `match_all` are both set.
    pub fn build(&self, tags: impl Into<TagInput>, options: SearchOptions) -> Result<SearchPlan> {
        if options.exclude && options.match_all {
            return Err(TaggingError::Config(
                "exclude and match_all cannot be combined".to_string(),
            ));
        }

        let names = self.normalize(tags.into());
        if names.is_empty() {
            return Ok(SearchPlan::NoMatch);
        }

        let spec = if options.exclude {
            self.excluding(names, options.conditions)
        } else {
            self.matching(names, options.match_all, options.conditions)
        };

        Ok(SearchPlan::Filter(spec))
    }

    fn normalize(&self, input: TagInput) -> Vec<String> {
        let names = match input {
            TagInput::Text(text) => TagParser::parse(text.as_str(), &self.config.delimiter),
            TagInput::Names(names) => normalize_names(names),
        };

        let mut seen = HashSet::new();
        names
            .into_iter()
            .filter(|name| seen.insert(name.to_ascii_lowercase()))
            .collect()
    }

    fn type_matches(&self) -> Predicate {
        Predicate::equals(Column::tagging("taggable_type"), self.kind.type_name)
    }

    fn tag_join(&self, kind: fn(Table, Predicate) -> Join) -> Join {
        kind(
            Table::Tags,
            Predicate::columns_equal(Column::tag("id"), Column::tagging("tag_id")),
        )
    }

    fn matching(
        &self,
        names: Vec<String>,
        match_all: bool,
        conditions: Option<Predicate>,
    ) -> FilterSpec {
        let primary_key = Column::primary_key(self.kind);
        let requested = names.len() as u64;

        let taggings_join = Join::left_outer(
            Table::Taggings,
            Predicate::columns_equal(Column::tagging("taggable_id"), primary_key)
                .and(self.type_matches()),
        );

        let predicate = Predicate::NameMatchesAny {
            column: Column::tag("name"),
            names,
        }
        .and_then(conditions);

        let (group_by, having) = if match_all {
            (
                Some(primary_key),
                Some(HavingCount::of(
                    Column::tagging("taggable_id"),
                    CmpOp::Eq,
                    requested,
                )),
            )
        } else {
            (None, None)
        };

        FilterSpec {
            kind: self.kind,
            select: primary_key,
            distinct: true,
            joins: vec![taggings_join, self.tag_join(Join::left_outer)],
            predicate,
            group_by,
            having,
        }
    }

    fn excluding(&self, names: Vec<String>, conditions: Option<Predicate>) -> FilterSpec {
        let primary_key = Column::primary_key(self.kind);

        let tagged = SubSelect {
            select: Column::tagging("taggable_id"),
            from: Table::Taggings,
            joins: vec![self.tag_join(Join::inner)],
            predicate: self.type_matches().and(Predicate::NameMatchesAny {
                column: Column::tag("name"),
                names,
            }),
        };

        let predicate = Predicate::NotIn {
            column: primary_key,
            subquery: Box::new(tagged),
        }
        .and_then(conditions);

        FilterSpec {
            kind: self.kind,
            select: primary_key,
            distinct: true,
            joins: Vec::new(),
            predicate,
            group_by: None,
            having: None,
        }
    }
}
