//! Document entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::tag::Tag;
use super::version::DocumentVersion;

/// A logical, versioned document.
///
/// The document row carries the identity and descriptive metadata shared
/// across all versions; `created_at` is set when the first version is
/// uploaded and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Document {
    /// Unique document identifier.
    pub id: i64,
    /// Document title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// When the document was created (first upload).
    pub created_at: DateTime<Utc>,
}

/// A document together with its latest version, tags, and version count.
///
/// This is the shape returned by listing and search: enough for a caller
/// to render a result row without further queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Unique document identifier.
    pub id: i64,
    /// Document title.
    pub title: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// The version with the highest version number, if any.
    pub latest_version: Option<DocumentVersion>,
    /// Tags associated with the document.
    pub tags: Vec<Tag>,
    /// Total number of versions the document holds.
    pub version_count: i64,
}

/// The full version history of one document, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionHistory {
    /// The document the versions belong to.
    pub document_id: i64,
    /// Document title.
    pub title: String,
    /// All versions ordered by version number ascending.
    pub versions: Vec<DocumentVersion>,
}
