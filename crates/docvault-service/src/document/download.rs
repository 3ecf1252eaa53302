//! Document download service: streams version payloads with transport
//! metadata.

use std::sync::Arc;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_database::repositories::DocumentRepository;
use docvault_entity::document::DocumentVersion;
use docvault_storage::{ByteStream, FileStore};

/// Result of a download: the payload stream plus everything an adapter
/// needs for Content-Type and Content-Disposition headers.
pub struct DownloadResult {
    /// The version being served.
    pub version: DocumentVersion,
    /// Payload content stream.
    pub stream: ByteStream,
    /// MIME type of the payload, for Content-Type or inline preview.
    pub content_type: &'static str,
    /// Suggested filename, `{title}_v{n}.{ext}`.
    pub filename: String,
    /// Payload size in bytes.
    pub size_bytes: i64,
}

impl std::fmt::Debug for DownloadResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResult")
            .field("version", &self.version)
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Serves document version payloads.
#[derive(Debug, Clone)]
pub struct DownloadService {
    /// Document repository.
    documents: Arc<DocumentRepository>,
    /// Payload store.
    store: Arc<FileStore>,
}

impl DownloadService {
    /// Creates a new download service.
    pub fn new(documents: Arc<DocumentRepository>, store: Arc<FileStore>) -> Self {
        Self { documents, store }
    }

    /// Download a document version; the latest when `version` is `None`.
    pub async fn download(
        &self,
        document_id: i64,
        version: Option<i32>,
    ) -> AppResult<DownloadResult> {
        let document = self
            .documents
            .find_by_id(document_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Document {document_id} not found")))?;

        let version = match version {
            Some(n) => self
                .documents
                .find_version(document_id, n)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Version {n} of document {document_id} not found"))
                })?,
            None => self
                .documents
                .find_latest_version(document_id)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(format!("Document {document_id} has no versions"))
                })?,
        };

        let stream = self.store.read(&version.file_path).await?;
        let filename = format!(
            "{}_v{}.{}",
            document.title,
            version.version_number,
            version.file_type.extension()
        );

        Ok(DownloadResult {
            content_type: version.file_type.mime_type(),
            filename,
            size_bytes: version.file_size,
            stream,
            version,
        })
    }
}
