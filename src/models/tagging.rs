use serde::Serialize;
use time::OffsetDateTime;

use super::{TagId, TaggableRef, TaggingId};

/// Association linking one tag to one taggable entity.
///
/// Deleted with its tag (foreign key cascade) or with its taggable
/// ([`crate::TaggingService::destroy_taggable`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tagging {
    pub id: TaggingId,
    pub tag_id: TagId,
    pub taggable: TaggableRef,
    /// When this tagging was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
