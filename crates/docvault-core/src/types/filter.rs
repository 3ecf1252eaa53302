//! Filter types for dynamic document query building.

use serde::{Deserialize, Serialize};

/// Multi-criteria filter over documents.
///
/// All present criteria combine with logical AND. An empty filter matches
/// every document, which makes the unfiltered listing and search share one
/// query path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Case-insensitive substring matched against title or description.
    pub text: Option<String>,
    /// Tag names to match, already normalized to lowercase.
    pub tags: Vec<String>,
    /// Whether a document must carry all of `tags` (true) or any (false).
    pub match_all: bool,
    /// File type of the latest version, lowercase (e.g. `"pdf"`).
    pub file_type: Option<String>,
}

impl DocumentFilter {
    /// True when no criteria are set.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.tags.is_empty() && self.file_type.is_none()
    }
}
