use time::OffsetDateTime;

use super::{CmpOp, Column, HavingCount, Join, Predicate, SortOrder, Table};
use crate::models::{OwnerScope, TaggableKind};

/// Ordering applied after grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCountOrder {
    /// By number of taggings.
    Count(SortOrder),
    /// By tag name.
    Name(SortOrder),
    /// By the newest tagging of each tag.
    LatestTagging(SortOrder),
}

/// Options for a tag frequency aggregation.
///
/// # Examples
///
/// ```
/// use taggable::{SortOrder, TagCountOptions, TagCountOrder};
///
/// let options = TagCountOptions::default()
///     .at_least(2)
///     .order(TagCountOrder::Count(SortOrder::Descending))
///     .limit(10);
/// assert_eq!(options.at_least, Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagCountOptions {
    /// Count only taggings created at or after this instant.
    pub start_at: Option<OffsetDateTime>,
    /// Count only taggings created at or before this instant.
    pub end_at: Option<OffsetDateTime>,
    /// Extra predicate ANDed in before grouping.
    pub conditions: Option<Predicate>,
    /// Drop tags with fewer taggings.
    pub at_least: Option<u64>,
    /// Drop tags with more taggings.
    pub at_most: Option<u64>,
    pub order: Option<TagCountOrder>,
    pub limit: Option<usize>,
}

impl TagCountOptions {
    pub fn start_at(mut self, at: OffsetDateTime) -> Self {
        self.start_at = Some(at);
        self
    }

    pub fn end_at(mut self, at: OffsetDateTime) -> Self {
        self.end_at = Some(at);
        self
    }

    pub fn conditions(mut self, predicate: Predicate) -> Self {
        self.conditions = Some(predicate);
        self
    }

    pub fn at_least(mut self, count: u64) -> Self {
        self.at_least = Some(count);
        self
    }

    pub fn at_most(mut self, count: u64) -> Self {
        self.at_most = Some(count);
        self
    }

    pub fn order(mut self, order: TagCountOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Grouped count query over `tags` joined to one kind's taggings.
///
/// Rows are `(tags.id, tags.name, COUNT(*))` grouped by tag.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationSpec {
    pub kind: TaggableKind,
    pub joins: Vec<Join>,
    pub predicate: Predicate,
    pub group_by: Vec<Column>,
    pub having: Vec<HavingCount>,
    pub order: Option<TagCountOrder>,
    pub limit: Option<usize>,
}

/// Builds per-tag usage counts for one taggable kind.
#[derive(Debug, Clone, Copy)]
pub struct TagFrequencyAggregator {
    kind: TaggableKind,
}

impl TagFrequencyAggregator {
    pub fn new(kind: TaggableKind) -> Self {
        Self { kind }
    }

    /// Builds the aggregation for `options`, optionally restricted to the
    /// taggables of one owner.
    ///
    /// The having-clause always starts with `COUNT(*) > 0`, followed by the
    /// `at_least` and `at_most` bounds when set.
    ///
    /// The taggable table is left-joined, so taggings whose entity row is gone
    /// still count unless a condition or owner scope filters on its columns.
    pub fn build(&self, options: &TagCountOptions, scope: Option<OwnerScope>) -> AggregationSpec {
        let kind = self.kind;
        let created_at = Column::tagging("created_at");

        let mut predicate = Predicate::equals(Column::tagging("taggable_type"), kind.type_name)
            .and_then(options.conditions.clone());
        if let Some(scope) = scope {
            predicate = predicate.and(Predicate::equals(
                Column::taggable(kind, scope.column),
                scope.owner_id,
            ));
        }
        if let Some(start_at) = options.start_at {
            predicate = predicate.and(Predicate::compare(created_at, CmpOp::GtEq, start_at));
        }
        if let Some(end_at) = options.end_at {
            predicate = predicate.and(Predicate::compare(created_at, CmpOp::LtEq, end_at));
        }

        let mut having = vec![HavingCount::rows(CmpOp::Gt, 0)];
        if let Some(at_least) = options.at_least {
            having.push(HavingCount::rows(CmpOp::GtEq, at_least));
        }
        if let Some(at_most) = options.at_most {
            having.push(HavingCount::rows(CmpOp::LtEq, at_most));
        }

        let joins = vec![
            Join::inner(
                Table::Taggings,
                Predicate::columns_equal(Column::tag("id"), Column::tagging("tag_id")),
            ),
            Join::left_outer(
                Table::Taggable(kind),
                Predicate::columns_equal(Column::primary_key(kind), Column::tagging("taggable_id")),
            ),
        ];

        AggregationSpec {
            kind,
            joins,
            predicate,
            group_by: vec![Column::tag("id"), Column::tag("name")],
            having,
            order: options.order,
            limit: options.limit,
        }
    }
}
