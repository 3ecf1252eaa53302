//! Multi-criteria document search.
//!
//! Search and the unfiltered listing share one repository query path;
//! this service only validates and normalizes the request into a
//! [`DocumentFilter`].

use std::sync::Arc;

use docvault_core::result::AppResult;
use docvault_core::types::filter::DocumentFilter;
use docvault_core::types::pagination::{Page, PageResponse};
use docvault_database::repositories::DocumentRepository;
use docvault_entity::document::{DocumentSummary, FileKind};

/// A search request. All present criteria combine with logical AND; an
/// empty request is equivalent to the unfiltered listing.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SearchRequest {
    /// Case-insensitive substring matched against title or description.
    #[serde(default)]
    pub query: Option<String>,
    /// Tag names to match, in any spelling.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether a document must carry all of `tags` (true) or any (false).
    #[serde(default)]
    pub match_all: bool,
    /// File type of the latest version (e.g. `"pdf"`).
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Searches documents by tags, text, and latest file type.
#[derive(Debug, Clone)]
pub struct SearchService {
    /// Document repository.
    documents: Arc<DocumentRepository>,
}

impl SearchService {
    /// Creates a new search service.
    pub fn new(documents: Arc<DocumentRepository>) -> Self {
        Self { documents }
    }

    /// Run a search, returning one page of summaries.
    pub async fn search(
        &self,
        request: &SearchRequest,
        page: &Page,
    ) -> AppResult<PageResponse<DocumentSummary>> {
        let filter = build_filter(request)?;
        self.documents.query(&filter, page).await
    }
}

/// Normalize a request into a repository filter.
///
/// Tag names are lowercased and deduped; an unknown `file_type` is
/// rejected before any query runs.
fn build_filter(request: &SearchRequest) -> AppResult<DocumentFilter> {
    let text = request
        .query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut tags: Vec<String> = Vec::new();
    for raw in &request.tags {
        let name = raw.trim().to_lowercase();
        if !name.is_empty() && !tags.contains(&name) {
            tags.push(name);
        }
    }

    let file_type = match request.file_type.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => {
            let kind: FileKind = s.parse()?;
            Some(kind.extension().to_string())
        }
        _ => None,
    };

    Ok(DocumentFilter {
        text,
        tags,
        match_all: request.match_all,
        file_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::error::ErrorKind;

    #[test]
    fn test_build_filter_normalizes() {
        let filter = build_filter(&SearchRequest {
            query: Some("  budget ".to_string()),
            tags: vec!["HR".to_string(), "hr".to_string(), " Policy".to_string()],
            match_all: true,
            file_type: Some(" PDF ".to_string()),
        })
        .unwrap();

        assert_eq!(filter.text.as_deref(), Some("budget"));
        assert_eq!(filter.tags, vec!["hr", "policy"]);
        assert!(filter.match_all);
        assert_eq!(filter.file_type.as_deref(), Some("pdf"));
    }

    #[test]
    fn test_build_filter_rejects_unknown_file_type() {
        let err = build_filter(&SearchRequest {
            file_type: Some("exe".to_string()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedType);
    }

    #[test]
    fn test_empty_request_yields_empty_filter() {
        let filter = build_filter(&SearchRequest::default()).unwrap();
        assert!(filter.is_empty());
    }
}
