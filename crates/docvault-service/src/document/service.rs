//! Document listing, version history, and deletion.

use std::sync::Arc;

use tracing::{error, info};

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::filter::DocumentFilter;
use docvault_core::types::pagination::{Page, PageResponse};
use docvault_database::repositories::DocumentRepository;
use docvault_entity::document::{DocumentSummary, VersionHistory};
use docvault_storage::FileStore;

use super::locks::DocumentLocks;

/// Document-level read and delete operations.
#[derive(Debug, Clone)]
pub struct DocumentService {
    /// Document repository.
    documents: Arc<DocumentRepository>,
    /// Payload store.
    store: Arc<FileStore>,
    /// Shared per-document mutation locks.
    locks: Arc<DocumentLocks>,
}

impl DocumentService {
    /// Creates a new document service.
    pub fn new(
        documents: Arc<DocumentRepository>,
        store: Arc<FileStore>,
        locks: Arc<DocumentLocks>,
    ) -> Self {
        Self {
            documents,
            store,
            locks,
        }
    }

    /// List documents in creation order, with latest version and tags.
    pub async fn list(&self, page: &Page) -> AppResult<PageResponse<DocumentSummary>> {
        self.documents.query(&DocumentFilter::default(), page).await
    }

    /// The full version history of one document, oldest first.
    pub async fn versions(&self, document_id: i64) -> AppResult<VersionHistory> {
        let document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))?;

        let versions = self.documents.find_versions(document_id).await?;
        Ok(VersionHistory {
            document_id,
            title: document.title,
            versions,
        })
    }

    /// Delete a document: all stored files, then all metadata.
    ///
    /// Files go first so that a storage failure leaves the document fully
    /// intact and the operation retryable. A metadata failure after the
    /// files are gone is a consistency fault that needs operator
    /// remediation; it is reported as such, never auto-repaired.
    pub async fn delete(&self, document_id: i64) -> AppResult<()> {
        let lock = self.locks.for_document(document_id);
        let _guard = lock.lock().await;

        if self.documents.find_by_id(document_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Document {document_id} not found"
            )));
        }

        self.store.remove_all(document_id).await?;

        match self.documents.delete(document_id).await {
            Ok(true) => {
                info!(document_id, "Document deleted");
                Ok(())
            }
            Ok(false) => Err(AppError::not_found(format!(
                "Document {document_id} not found"
            ))),
            Err(e) => {
                error!(
                    document_id,
                    error = %e,
                    "Stored files removed but metadata delete failed"
                );
                Err(AppError::with_source(
                    ErrorKind::Consistency,
                    format!(
                        "Files for document {document_id} were removed but its metadata remains"
                    ),
                    e,
                ))
            }
        }
    }
}
