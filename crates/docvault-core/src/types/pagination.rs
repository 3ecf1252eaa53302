//! Pagination types for list and search operations.

use serde::{Deserialize, Serialize};

/// Default number of items returned when no limit is given.
const DEFAULT_LIMIT: u64 = 100;
/// Hard ceiling on the number of items per request.
const MAX_LIMIT: u64 = 1000;

/// Request parameters for paginated queries (skip/limit style).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// Number of records to skip.
    #[serde(default)]
    pub skip: u64,
    /// Maximum number of records to return.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Page {
    /// Create a new page request. The limit is clamped to `1..=1000`.
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit: limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Calculate the SQL `OFFSET` value.
    pub fn offset(&self) -> u64 {
        self.skip
    }

    /// Return the SQL `LIMIT` value.
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T: Serialize> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items matching the query across all pages.
    pub total: u64,
    /// The skip value this page was fetched with.
    pub skip: u64,
    /// The limit this page was fetched with.
    pub limit: u64,
}

impl<T: Serialize> PageResponse<T> {
    /// Create a new paginated response.
    pub fn new(items: Vec<T>, total: u64, page: &Page) -> Self {
        Self {
            items,
            total,
            skip: page.skip,
            limit: page.limit(),
        }
    }

    /// Create an empty response.
    pub fn empty(page: &Page) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            skip: page.skip,
            limit: page.limit(),
        }
    }
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamped() {
        assert_eq!(Page::new(0, 0).limit(), 1);
        assert_eq!(Page::new(0, 5000).limit(), MAX_LIMIT);
        assert_eq!(Page::default().limit(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_offset_is_skip() {
        assert_eq!(Page::new(250, 50).offset(), 250);
    }
}
