//! Local filesystem file store for version payloads.

use std::pin::Pin;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::stream::StreamExt;
use futures::Stream;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use docvault_core::config::storage::StorageConfig;
use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_entity::document::version::FileKind;

use crate::path;

/// A byte stream type used for reading and writing file contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Result of a successful payload write.
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Storage-relative path of the payload.
    pub path: String,
    /// Actual number of bytes written.
    pub size_bytes: i64,
    /// File type derived from the client filename's extension.
    pub kind: FileKind,
}

/// Local filesystem payload store.
///
/// All payloads live under a configured root, partitioned per document.
/// Writes are atomic from the caller's perspective: content goes to a
/// `.part` temp file that is renamed into place only once complete, and
/// any failure removes the temp file.
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Root directory for all stored payloads.
    root: PathBuf,
    /// Maximum accepted payload size, enforced against actual bytes.
    max_file_size_bytes: u64,
}

impl FileStore {
    /// Create a new file store rooted at the configured path.
    pub async fn new(config: &StorageConfig) -> AppResult<Self> {
        let root = PathBuf::from(&config.root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            max_file_size_bytes: config.max_file_size_bytes,
        })
    }

    /// Resolve a storage-relative path to an absolute path within the
    /// root, rejecting any escape attempt before filesystem access.
    fn resolve(&self, rel: &str) -> AppResult<PathBuf> {
        path::validate(rel)?;
        Ok(self.root.join(rel))
    }

    /// Derive the file kind from the client filename, or reject it.
    fn kind_for(&self, original_filename: &str) -> AppResult<FileKind> {
        FileKind::from_filename(original_filename).ok_or_else(|| {
            AppError::unsupported_type(format!(
                "File '{original_filename}' is not an allowed type (pdf, docx, doc, txt)"
            ))
        })
    }

    /// Store a complete in-memory payload as a new version file.
    pub async fn put(
        &self,
        document_id: i64,
        version_number: i32,
        original_filename: &str,
        data: Bytes,
    ) -> AppResult<StoredFile> {
        let kind = self.kind_for(original_filename)?;
        if data.len() as u64 > self.max_file_size_bytes {
            return Err(AppError::payload_too_large(format!(
                "Payload of {} bytes exceeds the maximum of {} bytes",
                data.len(),
                self.max_file_size_bytes
            )));
        }

        let rel = path::version_path(document_id, version_number, kind);
        let full_path = self.resolve(&rel)?;
        self.ensure_parent(&full_path).await?;

        let part = part_path(&full_path);
        if let Err(e) = fs::write(&part, &data).await {
            let _ = fs::remove_file(&part).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write payload: {rel}"),
                e,
            ));
        }
        self.commit_part(&part, &full_path, &rel).await?;

        debug!(path = %rel, bytes = data.len(), "Stored payload");
        Ok(StoredFile {
            path: rel,
            size_bytes: data.len() as i64,
            kind,
        })
    }

    /// Store a streamed payload as a new version file.
    ///
    /// `declared_size` is only a fast-fail hint; the limit is enforced
    /// against the bytes actually written, so an understating client
    /// cannot smuggle an oversized payload through.
    pub async fn put_stream(
        &self,
        document_id: i64,
        version_number: i32,
        original_filename: &str,
        mut stream: ByteStream,
        declared_size: u64,
    ) -> AppResult<StoredFile> {
        let kind = self.kind_for(original_filename)?;
        if declared_size > self.max_file_size_bytes {
            return Err(AppError::payload_too_large(format!(
                "Declared size of {declared_size} bytes exceeds the maximum of {} bytes",
                self.max_file_size_bytes
            )));
        }

        let rel = path::version_path(document_id, version_number, kind);
        let full_path = self.resolve(&rel)?;
        self.ensure_parent(&full_path).await?;

        let part = part_path(&full_path);
        let mut file = fs::File::create(&part).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create payload file: {rel}"),
                e,
            )
        })?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    drop(file);
                    let _ = fs::remove_file(&part).await;
                    return Err(AppError::with_source(
                        ErrorKind::Storage,
                        "Payload stream read error",
                        e,
                    ));
                }
            };
            total_bytes += chunk.len() as u64;
            if total_bytes > self.max_file_size_bytes {
                drop(file);
                let _ = fs::remove_file(&part).await;
                return Err(AppError::payload_too_large(format!(
                    "Payload exceeds the maximum of {} bytes",
                    self.max_file_size_bytes
                )));
            }
            if let Err(e) = file.write_all(&chunk).await {
                drop(file);
                let _ = fs::remove_file(&part).await;
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    "Failed to write payload chunk",
                    e,
                ));
            }
        }

        if let Err(e) = file.flush().await {
            drop(file);
            let _ = fs::remove_file(&part).await;
            return Err(AppError::with_source(
                ErrorKind::Storage,
                "Failed to flush payload",
                e,
            ));
        }
        drop(file);
        self.commit_part(&part, &full_path, &rel).await?;

        debug!(path = %rel, bytes = total_bytes, "Stored streamed payload");
        Ok(StoredFile {
            path: rel,
            size_bytes: total_bytes as i64,
            kind,
        })
    }

    /// Read a stored payload as a byte stream.
    pub async fn read(&self, rel: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(rel)?;
        let file = fs::File::open(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Stored file not found: {rel}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to open stored file: {rel}"),
                    e,
                )
            }
        })?;
        Ok(Box::pin(ReaderStream::new(file)))
    }

    /// Read a stored payload fully into memory.
    pub async fn read_bytes(&self, rel: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(rel)?;
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("Stored file not found: {rel}"))
            } else {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read stored file: {rel}"),
                    e,
                )
            }
        })?;
        Ok(Bytes::from(data))
    }

    /// Delete a single stored payload. Idempotent; used by the upload
    /// orchestrator to compensate a failed metadata write.
    pub async fn remove(&self, rel: &str) -> AppResult<()> {
        let full_path = self.resolve(rel)?;
        if full_path.exists() {
            fs::remove_file(&full_path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete stored file: {rel}"),
                    e,
                )
            })?;
            warn!(path = %rel, "Removed stored payload");
        }
        Ok(())
    }

    /// Delete a document's entire storage subtree. Idempotent.
    pub async fn remove_all(&self, document_id: i64) -> AppResult<()> {
        let dir = self.root.join(path::document_prefix(document_id));
        if dir.exists() {
            fs::remove_dir_all(&dir).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to delete document subtree: {document_id}"),
                    e,
                )
            })?;
            debug!(document_id, "Removed document subtree");
        }
        Ok(())
    }

    /// Whether a stored payload exists.
    pub async fn exists(&self, rel: &str) -> AppResult<bool> {
        let full_path = self.resolve(rel)?;
        Ok(full_path.exists())
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Rename a completed `.part` file into its final place; on failure
    /// the temp file is removed so no partial payload survives.
    async fn commit_part(&self, part: &Path, full_path: &Path, rel: &str) -> AppResult<()> {
        fs::rename(part, full_path).await.map_err(|e| {
            let part = part.to_path_buf();
            tokio::spawn(async move {
                let _ = fs::remove_file(&part).await;
            });
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to finalize payload: {rel}"),
                e,
            )
        })
    }
}

/// Temp-file path used while a payload is being written.
fn part_path(full_path: &Path) -> PathBuf {
    let mut os = full_path.as_os_str().to_owned();
    os.push(".part");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn test_store(max_bytes: u64) -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            root_path: dir.path().to_str().unwrap().to_string(),
            max_file_size_bytes: max_bytes,
        };
        let store = FileStore::new(&config).await.unwrap();
        (dir, store)
    }

    fn byte_stream(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from_static(c)))
                .collect::<Vec<_>>(),
        ))
    }

    #[tokio::test]
    async fn test_put_read_roundtrip() {
        let (_dir, store) = test_store(1024).await;

        let stored = store
            .put(1, 1, "report.pdf", Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        assert!(stored.path.starts_with("1/v1_"));
        assert_eq!(stored.size_bytes, 11);
        assert_eq!(stored.kind, FileKind::Pdf);

        let read_back = store.read_bytes(&stored.path).await.unwrap();
        assert_eq!(read_back, Bytes::from_static(b"hello world"));
    }

    #[tokio::test]
    async fn test_put_stream_counts_actual_bytes() {
        let (_dir, store) = test_store(1024).await;

        let stored = store
            .put_stream(3, 2, "notes.txt", byte_stream(vec![b"abc", b"defg"]), 2)
            .await
            .unwrap();
        // Declared size was a lie; the recorded size is what was written.
        assert_eq!(stored.size_bytes, 7);
        assert_eq!(
            store.read_bytes(&stored.path).await.unwrap(),
            Bytes::from_static(b"abcdefg")
        );
    }

    #[tokio::test]
    async fn test_unsupported_extension_rejected() {
        let (_dir, store) = test_store(1024).await;

        let err = store
            .put(1, 1, "malware.exe", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedType);

        let err = store
            .put(1, 1, "noextension", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedType);
    }

    #[tokio::test]
    async fn test_oversize_leaves_nothing_behind() {
        let (dir, store) = test_store(5).await;

        let err = store
            .put(9, 1, "big.pdf", Bytes::from_static(b"too large"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PayloadTooLarge);

        // Streaming path trips the limit mid-write and cleans up its temp.
        let err = store
            .put_stream(9, 1, "big.pdf", byte_stream(vec![b"abc", b"defgh"]), 3)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PayloadTooLarge);

        let subtree = dir.path().join("9");
        let leftover = std::fs::read_dir(&subtree)
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_read_rejects_escaping_paths() {
        let (_dir, store) = test_store(1024).await;

        let err = store.read_bytes("../outside.pdf").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);

        let err = store.remove("/etc/passwd").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidPath);
    }

    #[tokio::test]
    async fn test_remove_all_is_idempotent() {
        let (_dir, store) = test_store(1024).await;

        let stored = store
            .put(4, 1, "a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        assert!(store.exists(&stored.path).await.unwrap());

        store.remove_all(4).await.unwrap();
        assert!(!store.exists(&stored.path).await.unwrap());

        // Second removal of an absent subtree succeeds.
        store.remove_all(4).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_single_file_is_idempotent() {
        let (_dir, store) = test_store(1024).await;

        let stored = store
            .put(5, 1, "a.doc", Bytes::from_static(b"a"))
            .await
            .unwrap();
        store.remove(&stored.path).await.unwrap();
        store.remove(&stored.path).await.unwrap();
        assert!(!store.exists(&stored.path).await.unwrap());
    }
}
