//! Document upload orchestration.
//!
//! An upload either creates a new document with version 1 or appends the
//! next version to an existing one. Payload storage and metadata
//! recording are two steps; whichever step fails, the orchestrator
//! compensates so that no half-created state survives: a stored file
//! without a version row is removed, a document row without any version
//! is deleted.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use docvault_core::config::storage::StorageConfig;
use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_database::repositories::{DocumentRepository, MetadataRefresh, NewVersion};
use docvault_storage::FileStore;

use super::locks::DocumentLocks;

/// Maximum accepted title length in characters.
const MAX_TITLE_CHARS: usize = 255;
/// Maximum accepted tag name length in characters.
const MAX_TAG_CHARS: usize = 100;

/// Parse a comma-separated tag list into individual names.
///
/// Boundary helper for adapters that receive tags as a single form
/// field. Segments are trimmed; empty segments are dropped.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// An uploaded payload with its client-supplied metadata.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename. Used for type detection and as display
    /// metadata; never as a storage path component.
    pub name: String,
    /// Size the client claims, used only as a fast-fail hint. The limit
    /// is enforced against the actual payload.
    pub declared_size: i64,
    /// Payload content.
    pub content: Bytes,
}

/// A structured upload request.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Target document; `None` creates a new one.
    pub document_id: Option<i64>,
    /// Document title. On re-upload the stored title is replaced.
    pub title: String,
    /// Optional description. On re-upload `None` keeps the stored value;
    /// an empty string clears it.
    pub description: Option<String>,
    /// Tag names. Uploads always replace the document's tag set.
    pub tags: Vec<String>,
    /// The payload.
    pub file: UploadedFile,
}

/// Identity of the version an upload produced.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadReceipt {
    /// The document the version belongs to.
    pub document_id: i64,
    /// The allocated version number.
    pub version_number: i32,
}

/// Orchestrates document uploads.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// Document repository.
    documents: Arc<DocumentRepository>,
    /// Payload store.
    store: Arc<FileStore>,
    /// Shared per-document mutation locks.
    locks: Arc<DocumentLocks>,
    /// Storage limits for request-level fast-fail checks.
    config: StorageConfig,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        documents: Arc<DocumentRepository>,
        store: Arc<FileStore>,
        locks: Arc<DocumentLocks>,
        config: StorageConfig,
    ) -> Self {
        Self {
            documents,
            store,
            locks,
            config,
        }
    }

    /// Store an uploaded file as a new document or as the next version
    /// of an existing one.
    pub async fn upload(&self, request: UploadRequest) -> AppResult<UploadReceipt> {
        let title = validate_title(&request.title)?;
        let tags = normalize_tags(&request.tags)?;

        if request.file.declared_size > 0
            && request.file.declared_size as u64 > self.config.max_file_size_bytes
        {
            return Err(AppError::payload_too_large(format!(
                "Declared size of {} bytes exceeds the maximum of {} bytes",
                request.file.declared_size, self.config.max_file_size_bytes
            )));
        }

        match request.document_id {
            None => {
                self.upload_new(title, request.description.as_deref(), &tags, &request.file)
                    .await
            }
            Some(document_id) => {
                self.upload_existing(
                    document_id,
                    title,
                    request.description.as_deref(),
                    &tags,
                    &request.file,
                )
                .await
            }
        }
    }

    /// First upload: create the document row, store the payload as
    /// version 1, record the version with its tag set.
    async fn upload_new(
        &self,
        title: &str,
        description: Option<&str>,
        tags: &[String],
        file: &UploadedFile,
    ) -> AppResult<UploadReceipt> {
        let document = self.documents.create(title, description).await?;

        let stored = match self
            .store
            .put(document.id, 1, &file.name, file.content.clone())
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_document(document.id).await;
                return Err(e);
            }
        };

        let version = NewVersion {
            document_id: document.id,
            version_number: 1,
            file_path: &stored.path,
            original_filename: &file.name,
            file_size: stored.size_bytes,
            file_type: stored.kind,
        };

        match self.documents.record_version(&version, tags, None).await {
            Ok(row) => {
                info!(
                    document_id = document.id,
                    version = row.version_number,
                    size = row.file_size,
                    "Document created"
                );
                Ok(UploadReceipt {
                    document_id: document.id,
                    version_number: row.version_number,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&stored.path).await {
                    warn!(
                        document_id = document.id,
                        error = %cleanup,
                        "Failed to remove stored payload after metadata failure"
                    );
                }
                self.discard_document(document.id).await;
                Err(e)
            }
        }
    }

    /// Subsequent upload: allocate the next version number under the
    /// document's lock, store the payload, record the version and
    /// refresh the descriptive metadata.
    async fn upload_existing(
        &self,
        document_id: i64,
        title: &str,
        description: Option<&str>,
        tags: &[String],
        file: &UploadedFile,
    ) -> AppResult<UploadReceipt> {
        let lock = self.locks.for_document(document_id);
        let _guard = lock.lock().await;

        if self.documents.find_by_id(document_id).await?.is_none() {
            return Err(AppError::not_found(format!(
                "Document {document_id} not found"
            )));
        }

        let version_number = self.documents.next_version_number(document_id).await?;
        let stored = self
            .store
            .put(document_id, version_number, &file.name, file.content.clone())
            .await?;

        let version = NewVersion {
            document_id,
            version_number,
            file_path: &stored.path,
            original_filename: &file.name,
            file_size: stored.size_bytes,
            file_type: stored.kind,
        };
        let refresh = MetadataRefresh { title, description };

        match self
            .documents
            .record_version(&version, tags, Some(refresh))
            .await
        {
            Ok(row) => {
                info!(
                    document_id,
                    version = row.version_number,
                    size = row.file_size,
                    "Version uploaded"
                );
                Ok(UploadReceipt {
                    document_id,
                    version_number: row.version_number,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&stored.path).await {
                    warn!(
                        document_id,
                        error = %cleanup,
                        "Failed to remove stored payload after metadata failure"
                    );
                }
                Err(e)
            }
        }
    }

    /// Best-effort removal of a document row whose first upload did not
    /// complete. The row holds no versions; leaving it would violate the
    /// no-zero-version invariant.
    async fn discard_document(&self, document_id: i64) {
        match self.documents.delete(document_id).await {
            Ok(_) => {
                warn!(document_id, "Discarded document after failed first upload");
            }
            Err(e) => {
                warn!(
                    document_id,
                    error = %e,
                    "Failed to discard document after failed first upload"
                );
            }
        }
    }
}

/// Validate and trim a title.
fn validate_title(title: &str) -> AppResult<&str> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::validation(format!(
            "Title exceeds {MAX_TITLE_CHARS} characters"
        )));
    }
    Ok(title)
}

/// Trim, length-check, and dedupe tag names.
///
/// Duplicates are compared case-insensitively; the first spelling wins
/// and is preserved as the display form.
fn normalize_tags(tags: &[String]) -> AppResult<Vec<String>> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for raw in tags {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        if name.chars().count() > MAX_TAG_CHARS {
            return Err(AppError::validation(format!(
                "Tag '{name}' exceeds {MAX_TAG_CHARS} characters"
            )));
        }
        let folded = name.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(name.to_string());
    }
    Ok(out)
}
