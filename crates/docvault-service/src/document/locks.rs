//! Per-document async lock registry.
//!
//! Version number allocation and whole-document deletion must not
//! interleave for the same document. Each document gets one
//! `tokio::sync::Mutex`; every mutating service path acquires it before
//! touching the document's rows or files. The UNIQUE constraint on
//! `(document_id, version_number)` backs the lock at the database level.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Registry of per-document mutation locks.
///
/// One instance is shared by every service that mutates documents.
/// Entries are created on first use and kept for the process lifetime;
/// an idle lock is a few words of memory.
#[derive(Debug, Default)]
pub struct DocumentLocks {
    locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl DocumentLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutation lock for one document.
    pub fn for_document(&self, document_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
