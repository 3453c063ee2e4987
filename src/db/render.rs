//! Renders query specifications into parameterized SQLite statements.
//!
//! Table and column identifiers come from `&'static str` descriptors and are
//! written into the SQL text. Values are always bound as `?` parameters.

use rusqlite::types::Value as SqlValue;

use crate::query::{
    AggregationSpec, Column, FilterSpec, HavingCount, Join, JoinKind, Predicate, SortOrder,
    SubSelect, TagCountOrder, Value,
};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Renders a search filter selecting matching primary keys.
pub fn render_search(spec: &FilterSpec) -> RenderedQuery {
    let mut w = SqlWriter::default();

    w.push("SELECT ");
    if spec.distinct {
        w.push("DISTINCT ");
    }
    w.column(&spec.select);
    w.push(" FROM ");
    w.push(spec.kind.table);
    w.joins(&spec.joins);
    w.push(" WHERE ");
    w.predicate(&spec.predicate);

    if let Some(group_by) = &spec.group_by {
        w.push(" GROUP BY ");
        w.column(group_by);
    }
    if let Some(having) = &spec.having {
        w.push(" HAVING ");
        w.having(std::slice::from_ref(having));
    }

    w.push(" ORDER BY ");
    w.column(&spec.select);

    w.finish()
}

/// Renders a tag count aggregation returning `(id, name, count)` rows.
pub fn render_aggregation(spec: &AggregationSpec) -> RenderedQuery {
    let mut w = SqlWriter::default();

    w.push("SELECT tags.id, tags.name, COUNT(*) AS count FROM tags");
    w.joins(&spec.joins);
    w.push(" WHERE ");
    w.predicate(&spec.predicate);

    if !spec.group_by.is_empty() {
        w.push(" GROUP BY ");
        for (i, column) in spec.group_by.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.column(column);
        }
    }
    if !spec.having.is_empty() {
        w.push(" HAVING ");
        w.having(&spec.having);
    }

    if let Some(order) = spec.order {
        let (key, direction) = match order {
            TagCountOrder::Count(direction) => ("COUNT(*)", direction),
            TagCountOrder::Name(direction) => ("tags.name", direction),
            TagCountOrder::LatestTagging(direction) => ("MAX(taggings.created_at)", direction),
        };
        w.push(" ORDER BY ");
        w.push(key);
        w.push(match direction {
            SortOrder::Ascending => " ASC",
            SortOrder::Descending => " DESC",
        });
        // Stable output among equal keys
        w.push(", tags.id ASC");
    }

    if let Some(limit) = spec.limit {
        w.push(" LIMIT ");
        w.bind(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
    }

    w.finish()
}

/// Escapes LIKE wildcards so a name matches only itself.
pub fn escape_like(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Timestamp(v) => SqlValue::Integer(v.unix_timestamp()),
    }
}

#[derive(Default)]
struct SqlWriter {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlWriter {
    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn bind(&mut self, value: SqlValue) {
        self.sql.push('?');
        self.params.push(value);
    }

    fn column(&mut self, column: &Column) {
        self.sql.push_str(column.table.name());
        self.sql.push('.');
        self.sql.push_str(column.name);
    }

    fn joins(&mut self, joins: &[Join]) {
        for join in joins {
            self.push(match join.kind {
                JoinKind::Inner => " INNER JOIN ",
                JoinKind::LeftOuter => " LEFT OUTER JOIN ",
            });
            self.push(join.table.name());
            self.push(" ON ");
            self.predicate(&join.on);
        }
    }

    fn having(&mut self, bounds: &[HavingCount]) {
        for (i, bound) in bounds.iter().enumerate() {
            if i > 0 {
                self.push(" AND ");
            }
            self.push("COUNT(");
            match &bound.column {
                Some(column) => self.column(column),
                None => self.push("*"),
            }
            self.push(") ");
            self.push(bound.op.as_sql());
            self.push(" ");
            self.bind(SqlValue::Integer(i64::try_from(bound.value).unwrap_or(i64::MAX)));
        }
    }

    fn subselect(&mut self, sub: &SubSelect) {
        self.push("SELECT ");
        self.column(&sub.select);
        self.push(" FROM ");
        self.push(sub.from.name());
        self.joins(&sub.joins);
        self.push(" WHERE ");
        self.predicate(&sub.predicate);
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::True => self.push("1 = 1"),
            Predicate::False => self.push("1 = 0"),
            Predicate::Compare { column, op, value } => {
                self.column(column);
                self.push(" ");
                self.push(op.as_sql());
                self.push(" ");
                self.bind(to_sql_value(value));
            }
            Predicate::ColumnsEqual(left, right) => {
                self.column(left);
                self.push(" = ");
                self.column(right);
            }
            Predicate::NameMatchesAny { column, names } => {
                if names.is_empty() {
                    self.push("1 = 0");
                    return;
                }
                self.push("(");
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        self.push(" OR ");
                    }
                    self.column(column);
                    self.push(" LIKE ");
                    self.bind(SqlValue::Text(escape_like(name)));
                    self.push(r" ESCAPE '\'");
                }
                self.push(")");
            }
            Predicate::NotIn { column, subquery } => {
                self.column(column);
                self.push(" NOT IN (");
                self.subselect(subquery);
                self.push(")");
            }
            Predicate::And(parts) => self.list(parts, " AND ", "1 = 1"),
            Predicate::Or(parts) => self.list(parts, " OR ", "1 = 0"),
            Predicate::Not(inner) => {
                self.push("NOT (");
                self.predicate(inner);
                self.push(")");
            }
        }
    }

    fn list(&mut self, parts: &[Predicate], separator: &str, empty: &str) {
        if parts.is_empty() {
            self.push(empty);
            return;
        }
        self.push("(");
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.push(separator);
            }
            self.predicate(part);
        }
        self.push(")");
    }

    fn finish(self) -> RenderedQuery {
        RenderedQuery {
            sql: self.sql,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OwnerScope, TaggableKind};
    use crate::query::{
        SearchOptions, TagCountOptions, TagFrequencyAggregator, TaggedSearchQueryBuilder,
    };
    use time::macros::datetime;

    const POST: TaggableKind = TaggableKind::new("Post", "posts");

    fn search(tags: &str, options: SearchOptions) -> RenderedQuery {
        let plan = TaggedSearchQueryBuilder::new(POST)
            .build(tags, options)
            .unwrap();
        render_search(plan.filter().unwrap())
    }

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn match_any_renders_left_joins_and_like() {
        let q = search("Nature, Good", SearchOptions::default());

        assert_eq!(
            q.sql,
            "SELECT DISTINCT posts.id FROM posts \
             LEFT OUTER JOIN taggings ON (taggings.taggable_id = posts.id AND taggings.taggable_type = ?) \
             LEFT OUTER JOIN tags ON tags.id = taggings.tag_id \
             WHERE (tags.name LIKE ? ESCAPE '\\' OR tags.name LIKE ? ESCAPE '\\') \
             ORDER BY posts.id"
        );
        assert_eq!(q.params, vec![text("Post"), text("Nature"), text("Good")]);
    }

    #[test]
    fn match_all_renders_group_and_having() {
        let q = search("Nature, Good", SearchOptions::default().match_all());

        assert!(q.sql.ends_with(
            "GROUP BY posts.id HAVING COUNT(taggings.taggable_id) = ? ORDER BY posts.id"
        ));
        assert_eq!(q.params.last(), Some(&SqlValue::Integer(2)));
    }

    #[test]
    fn exclude_renders_not_in_subquery() {
        let q = search("Nature", SearchOptions::default().exclude());

        assert_eq!(
            q.sql,
            "SELECT DISTINCT posts.id FROM posts WHERE posts.id NOT IN (\
             SELECT taggings.taggable_id FROM taggings \
             INNER JOIN tags ON tags.id = taggings.tag_id \
             WHERE (taggings.taggable_type = ? AND (tags.name LIKE ? ESCAPE '\\'))) \
             ORDER BY posts.id"
        );
        assert_eq!(q.params, vec![text("Post"), text("Nature")]);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");

        let q = search("50%", SearchOptions::default());
        assert_eq!(q.params[1], text("50\\%"));
    }

    #[test]
    fn aggregation_renders_grouping_having_order_and_limit() {
        let options = TagCountOptions::default()
            .start_at(datetime!(2006-08-04 00:00 UTC))
            .at_least(2)
            .order(TagCountOrder::Count(SortOrder::Descending))
            .limit(5);
        let spec = TagFrequencyAggregator::new(POST).build(&options, Some(OwnerScope::new("user_id", 1)));
        let q = render_aggregation(&spec);

        assert_eq!(
            q.sql,
            "SELECT tags.id, tags.name, COUNT(*) AS count FROM tags \
             INNER JOIN taggings ON tags.id = taggings.tag_id \
             LEFT OUTER JOIN posts ON posts.id = taggings.taggable_id \
             WHERE (taggings.taggable_type = ? AND posts.user_id = ? AND taggings.created_at >= ?) \
             GROUP BY tags.id, tags.name \
             HAVING COUNT(*) > ? AND COUNT(*) >= ? \
             ORDER BY COUNT(*) DESC, tags.id ASC LIMIT ?"
        );
        assert_eq!(
            q.params,
            vec![
                text("Post"),
                SqlValue::Integer(1),
                SqlValue::Integer(datetime!(2006-08-04 00:00 UTC).unix_timestamp()),
                SqlValue::Integer(0),
                SqlValue::Integer(2),
                SqlValue::Integer(5),
            ]
        );
    }

    #[test]
    fn aggregation_without_order_has_no_order_clause() {
        let spec = TagFrequencyAggregator::new(POST).build(&TagCountOptions::default(), None);
        let q = render_aggregation(&spec);
        assert!(!q.sql.contains("ORDER BY"));
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn constant_and_negated_predicates() {
        let mut w = SqlWriter::default();
        w.predicate(&Predicate::False.or(Predicate::True.negate()));
        assert_eq!(w.sql, "(1 = 0 OR NOT (1 = 1))");

        let mut w = SqlWriter::default();
        w.predicate(&Predicate::And(Vec::new()));
        assert_eq!(w.sql, "1 = 1");
    }
}
