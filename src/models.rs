mod language;
mod metadata;
mod post;
mod tag_mapping;

pub use language::Language;
pub use metadata::MetadataRecord;
pub use post::Post;
pub use tag_mapping::{NonStringCanonical, TagMapping};
