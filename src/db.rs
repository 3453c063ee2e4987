pub mod render;
mod schema;

use std::path::Path;
use std::time::Duration;

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};
use tracing::{debug, warn};

use crate::error::{Result, TaggingError};
use crate::models::{TagCount, TagId, TaggableId};
use crate::query::{AggregationSpec, SearchPlan};

use render::{render_aggregation, render_search};
use schema::INITIAL_SCHEMA;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper providing connection management, schema initialization
/// and execution of rendered query specifications.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Enables foreign keys and creates the tagging tables.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    ///
    /// Host applications use this to create and populate their taggable tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front so concurrent writers serialize on
    /// the database rather than failing at commit. Commits when `f` returns
    /// `Ok`; rolls back on any error and returns it unchanged.
    pub fn immediate_transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = &self.conn;
        conn.execute_batch("BEGIN IMMEDIATE")?;

        let result = f(conn).and_then(|value| {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        });

        if result.is_err() && !conn.is_autocommit() {
            if let Err(e) = conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "rollback failed");
            }
        }

        result
    }

    /// Executes a search plan, returning matching primary keys in ascending order.
    ///
    /// [`SearchPlan::NoMatch`] returns an empty list without querying.
    pub fn execute_search(&self, plan: &SearchPlan) -> Result<Vec<TaggableId>> {
        let Some(spec) = plan.filter() else {
            debug!("empty tag set, skipping search");
            return Ok(Vec::new());
        };

        let query = render_search(spec);
        debug!(kind = %spec.kind, sql = %query.sql, "executing tagged search");

        let mut stmt = self.conn.prepare(&query.sql)?;
        let ids = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                row.get::<_, i64>(0)
            })?
            .map(|id| id.map(TaggableId::new))
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(ids)
    }

    /// Executes a tag count aggregation.
    ///
    /// Counts are coerced to `u64` whatever storage class the engine returns.
    pub fn execute_tag_counts(&self, spec: &AggregationSpec) -> Result<Vec<TagCount>> {
        let query = render_aggregation(spec);
        debug!(kind = %spec.kind, sql = %query.sql, "executing tag counts");

        let mut stmt = self.conn.prepare(&query.sql)?;
        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, SqlValue>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, name, count)| Ok(TagCount::new(TagId::new(id), name, coerce_count(count)?)))
            .collect()
    }
}

/// Converts a raw aggregate value into a non-negative count.
pub(crate) fn coerce_count(value: SqlValue) -> Result<u64> {
    match value {
        SqlValue::Null => Ok(0),
        SqlValue::Integer(n) => {
            u64::try_from(n).map_err(|_| TaggingError::InvalidCount(n.to_string()))
        }
        SqlValue::Real(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        SqlValue::Real(f) => Err(TaggingError::InvalidCount(f.to_string())),
        SqlValue::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| TaggingError::InvalidCount(s.clone())),
        SqlValue::Blob(_) => Err(TaggingError::InvalidCount("blob".to_string())),
    }
}
