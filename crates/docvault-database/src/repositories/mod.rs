//! Repository implementations, one per aggregate.

pub mod document;
pub mod tag;

pub use document::{DocumentRepository, MetadataRefresh, NewVersion};
pub use tag::TagRepository;
