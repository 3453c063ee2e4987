//! Storage-agnostic query specifications.
//!
//! Builders in this module never touch storage. They produce a typed tree of
//! joins, predicates, grouping and ordering that an execution layer renders
//! into a parameterized query (see [`crate::db::render`]). Identifiers in the
//! tree are `&'static str`; every user-supplied value is a [`Value`] and is
//! bound, never interpolated.

mod frequency;
mod search;

use time::OffsetDateTime;

use crate::models::TaggableKind;

pub use frequency::{AggregationSpec, TagCountOptions, TagCountOrder, TagFrequencyAggregator};
pub use search::{FilterSpec, SearchOptions, SearchPlan, TagInput, TaggedSearchQueryBuilder};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    #[default]
    Descending,
}

/// A table taking part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tags,
    Taggings,
    /// The entity table of a taggable kind.
    Taggable(TaggableKind),
}

impl Table {
    /// Returns the table's SQL name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Taggings => "taggings",
            Self::Taggable(kind) => kind.table,
        }
    }
}

/// A column qualified by its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub table: Table,
    pub name: &'static str,
}

impl Column {
    pub const fn new(table: Table, name: &'static str) -> Self {
        Self { table, name }
    }

    /// A column of `tags`.
    pub const fn tag(name: &'static str) -> Self {
        Self::new(Table::Tags, name)
    }

    /// A column of `taggings`.
    pub const fn tagging(name: &'static str) -> Self {
        Self::new(Table::Taggings, name)
    }

    /// A column of a taggable kind's own table.
    pub const fn taggable(kind: TaggableKind, name: &'static str) -> Self {
        Self::new(Table::Taggable(kind), name)
    }

    /// The primary key column of a taggable kind.
    pub const fn primary_key(kind: TaggableKind) -> Self {
        Self::taggable(kind, kind.primary_key)
    }
}

/// A bound parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Real(f64),
    Text(String),
    /// Stored as Unix seconds.
    Timestamp(OffsetDateTime),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(v: OffsetDateTime) -> Self {
        Self::Timestamp(v)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Boolean filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    /// `column <op> value`.
    Compare {
        column: Column,
        op: CmpOp,
        value: Value,
    },
    /// `left = right`, used for join conditions.
    ColumnsEqual(Column, Column),
    /// Case-insensitive literal match of `column` against any of `names`.
    NameMatchesAny { column: Column, names: Vec<String> },
    /// `column NOT IN (subquery)`.
    NotIn {
        column: Column,
        subquery: Box<SubSelect>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: Column, op: CmpOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn equals(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    pub fn columns_equal(left: Column, right: Column) -> Self {
        Self::ColumnsEqual(left, right)
    }

    /// Conjunction, flattening nested `And`s and dropping `True`.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::True, p) | (p, Self::True) => p,
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), p) => {
                left.push(p);
                Self::And(left)
            }
            (p, Self::And(mut right)) => {
                right.insert(0, p);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }

    /// Conjunction with an optional extra predicate.
    pub fn and_then(self, other: Option<Predicate>) -> Self {
        match other {
            Some(p) => self.and(p),
            None => self,
        }
    }

    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Self::Or(mut left), p) => {
                left.push(p);
                Self::Or(left)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// A single-column sub-selection used by `NOT IN`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubSelect {
    pub select: Column,
    pub from: Table,
    pub joins: Vec<Join>,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// A join descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: Table,
    pub on: Predicate,
}

impl Join {
    pub fn inner(table: Table, on: Predicate) -> Self {
        Self {
            kind: JoinKind::Inner,
            table,
            on,
        }
    }

    pub fn left_outer(table: Table, on: Predicate) -> Self {
        Self {
            kind: JoinKind::LeftOuter,
            table,
            on,
        }
    }
}

/// Post-aggregation bound on a row count.
///
/// `column: None` counts rows (`COUNT(*)`); otherwise non-null values of the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HavingCount {
    pub column: Option<Column>,
    pub op: CmpOp,
    pub value: u64,
}

impl HavingCount {
    pub fn rows(op: CmpOp, value: u64) -> Self {
        Self {
            column: None,
            op,
            value,
        }
    }

    pub fn of(column: Column, op: CmpOp, value: u64) -> Self {
        Self {
            column: Some(column),
            op,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: TaggableKind = TaggableKind::new("Post", "posts");

    #[test]
    fn and_drops_true() {
        let p = Predicate::equals(Column::tag("name"), "A");
        assert_eq!(Predicate::True.and(p.clone()), p);
        assert_eq!(p.clone().and(Predicate::True), p);
    }

    #[test]
    fn and_flattens_nested_conjunctions() {
        let a = Predicate::equals(Column::tag("name"), "A");
        let b = Predicate::equals(Column::tag("name"), "B");
        let c = Predicate::equals(Column::tag("name"), "C");

        let combined = a.clone().and(b.clone()).and(c.clone());
        assert_eq!(combined, Predicate::And(vec![a, b, c]));
    }

    #[test]
    fn and_then_ignores_none() {
        let a = Predicate::equals(Column::tag("name"), "A");
        assert_eq!(a.clone().and_then(None), a);
    }

    #[test]
    fn primary_key_uses_kind_descriptor() {
        let kind = POST.with_primary_key("post_id");
        let column = Column::primary_key(kind);
        assert_eq!(column.table.name(), "posts");
        assert_eq!(column.name, "post_id");
    }

    #[test]
    fn values_convert_from_primitives() {
        assert_eq!(Value::from(3_i64), Value::Integer(3));
        assert_eq!(Value::from("x"), Value::Text("x".into()));
    }
}
