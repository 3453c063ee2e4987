mod ids;
mod tag;
mod tag_list;
mod taggable;
mod tagging;

pub use ids::{TagId, TaggableId, TaggingId};
pub use tag::{Tag, TagCount};
pub use tag_list::{TagList, TagListHandle};
pub use taggable::{OwnerScope, TaggableKind, TaggableRef};
pub use tagging::Tagging;
