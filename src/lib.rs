//! Tagging for entities stored in SQLite.
//!
//! Parses and formats delimited tag lists, builds typed search and tag count
//! specifications, and reconciles an entity's stored taggings with a desired
//! [`TagList`] in one transaction.
//!
//! # Examples
//!
//! ```
//! use taggable::{Database, SearchOptions, TagListHandle, TaggableKind, TaggingService};
//!
//! const POST: TaggableKind = TaggableKind::new("Post", "posts");
//!
//! # fn main() -> anyhow::Result<()> {
//! let service = TaggingService::new(Database::in_memory()?);
//! service
//!     .database()
//!     .connection()
//!     .execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY)")?;
//!
//! let mut post = TagListHandle::new(POST.entity(1));
//! post.set_tag_list_text("Nature, Good", ",");
//! service.save_tag_list(&mut post, |conn| {
//!     conn.execute("INSERT INTO posts (id) VALUES (1)", [])?;
//!     Ok(())
//! })?;
//!
//! let found = service.find_tagged_with(POST, "good", SearchOptions::default())?;
//! assert_eq!(found.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cloud;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod parser;
pub mod query;
pub mod service;
pub mod sync;

pub use cloud::tag_cloud;
pub use config::{DEFAULT_DELIMITER, TagConfig};
pub use db::Database;
pub use error::{Result, TaggingError};
pub use models::{
    OwnerScope, Tag, TagCount, TagId, TagList, TagListHandle, TaggableId, TaggableKind,
    TaggableRef, Tagging, TaggingId,
};
pub use parser::TagParser;
pub use query::{
    AggregationSpec, CmpOp, Column, FilterSpec, Predicate, SearchOptions, SearchPlan, SortOrder,
    TagCountOptions, TagCountOrder, TagFrequencyAggregator, TagInput, TaggedSearchQueryBuilder,
    Value,
};
pub use service::TaggingService;
pub use sync::{SyncReport, TagSynchronizer};
