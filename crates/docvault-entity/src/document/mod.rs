//! Document domain: documents, their versions, and tags.

pub mod model;
pub mod tag;
pub mod version;

pub use model::{Document, DocumentSummary, VersionHistory};
pub use tag::Tag;
pub use version::{DocumentVersion, FileKind};
