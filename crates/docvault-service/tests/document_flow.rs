//! End-to-end service tests: upload, versioning, download, deletion, and
//! search against a real temp-file SQLite database and payload store.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

use docvault_core::config::storage::StorageConfig;
use docvault_core::config::DatabaseConfig;
use docvault_core::error::ErrorKind;
use docvault_core::types::pagination::Page;
use docvault_database::migration;
use docvault_database::repositories::DocumentRepository;
use docvault_database::DatabasePool;
use docvault_service::{
    DocumentLocks, DocumentService, DownloadService, SearchRequest, SearchService, UploadRequest,
    UploadService, UploadedFile,
};
use docvault_storage::{ByteStream, FileStore};

struct TestVault {
    _dir: tempfile::TempDir,
    storage_root: PathBuf,
    upload: UploadService,
    download: DownloadService,
    documents: DocumentService,
    search: SearchService,
}

async fn vault_with_max(max_file_size_bytes: u64) -> TestVault {
    let dir = tempfile::tempdir().unwrap();

    let db_config = DatabaseConfig {
        url: format!("sqlite://{}/vault.db", dir.path().display()),
        max_connections: 5,
        connect_timeout_seconds: 10,
        busy_timeout_seconds: 5,
    };
    let pool = DatabasePool::connect(&db_config).await.unwrap();
    migration::run_migrations(pool.pool()).await.unwrap();

    let storage_root = dir.path().join("storage");
    let storage_config = StorageConfig {
        root_path: storage_root.to_str().unwrap().to_string(),
        max_file_size_bytes,
    };
    let store = Arc::new(FileStore::new(&storage_config).await.unwrap());
    let repo = Arc::new(DocumentRepository::new(pool.pool().clone()));
    let locks = Arc::new(DocumentLocks::new());

    TestVault {
        _dir: dir,
        storage_root,
        upload: UploadService::new(repo.clone(), store.clone(), locks.clone(), storage_config),
        download: DownloadService::new(repo.clone(), store.clone()),
        documents: DocumentService::new(repo.clone(), store, locks),
        search: SearchService::new(repo),
    }
}

async fn vault() -> TestVault {
    vault_with_max(1024 * 1024).await
}

fn request(
    document_id: Option<i64>,
    title: &str,
    tags: &[&str],
    filename: &str,
    content: &'static [u8],
) -> UploadRequest {
    UploadRequest {
        document_id,
        title: title.to_string(),
        description: None,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        file: UploadedFile {
            name: filename.to_string(),
            declared_size: content.len() as i64,
            content: Bytes::from_static(content),
        },
    }
}

async fn collect(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.unwrap());
    }
    out
}

#[tokio::test]
async fn test_upload_versions_download_and_delete_flow() {
    let vault = vault().await;

    let first = vault
        .upload
        .upload(request(
            None,
            "Employee Policy",
            &["hr", "policy"],
            "policy_draft.pdf",
            b"draft content",
        ))
        .await
        .unwrap();
    assert_eq!(first.version_number, 1);

    let second = vault
        .upload
        .upload(request(
            Some(first.document_id),
            "Employee Policy",
            &["hr", "policy"],
            "policy_final.pdf",
            b"final content",
        ))
        .await
        .unwrap();
    assert_eq!(second.document_id, first.document_id);
    assert_eq!(second.version_number, 2);

    let history = vault.documents.versions(first.document_id).await.unwrap();
    assert_eq!(history.title, "Employee Policy");
    assert_eq!(
        history.versions.iter().map(|v| v.version_number).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(history.versions[0].original_filename, "policy_draft.pdf");

    // Latest version when no number is given.
    let latest = vault.download.download(first.document_id, None).await.unwrap();
    assert_eq!(latest.version.version_number, 2);
    assert_eq!(latest.filename, "Employee Policy_v2.pdf");
    assert_eq!(latest.content_type, "application/pdf");
    assert_eq!(latest.size_bytes, b"final content".len() as i64);
    assert_eq!(collect(latest.stream).await, b"final content");

    // A specific historical version stays retrievable.
    let old = vault
        .download
        .download(first.document_id, Some(1))
        .await
        .unwrap();
    assert_eq!(collect(old.stream).await, b"draft content");

    let found = vault
        .search
        .search(
            &SearchRequest {
                tags: vec!["hr".to_string()],
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, first.document_id);

    vault.documents.delete(first.document_id).await.unwrap();

    let err = vault
        .download
        .download(first.document_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    // Second delete observes the document as already gone.
    let err = vault.documents.delete(first.document_id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_reupload_refreshes_metadata_and_replaces_tags() {
    let vault = vault().await;

    let mut initial = request(None, "Draft Notes", &["draft"], "notes.txt", b"v1");
    initial.description = Some("first pass".to_string());
    let receipt = vault.upload.upload(initial).await.unwrap();

    // New title, no description supplied, entirely new tag set.
    let receipt2 = vault
        .upload
        .upload(request(
            Some(receipt.document_id),
            "Final Notes",
            &["published"],
            "notes.txt",
            b"v2",
        ))
        .await
        .unwrap();
    assert_eq!(receipt2.version_number, 2);

    let listed = vault.documents.list(&Page::default()).await.unwrap();
    assert_eq!(listed.total, 1);
    let summary = &listed.items[0];
    assert_eq!(summary.title, "Final Notes");
    // Omitted description keeps the stored value.
    assert_eq!(summary.description.as_deref(), Some("first pass"));
    assert_eq!(summary.version_count, 2);
    let tag_names: Vec<&str> = summary.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(tag_names, vec!["published"]);
}

#[tokio::test]
async fn test_concurrent_uploads_allocate_sequential_versions() {
    let vault = vault().await;

    let receipt = vault
        .upload
        .upload(request(None, "Contended", &[], "base.pdf", b"v1"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let upload = vault.upload.clone();
        let document_id = receipt.document_id;
        handles.push(tokio::spawn(async move {
            upload
                .upload(UploadRequest {
                    document_id: Some(document_id),
                    title: "Contended".to_string(),
                    description: None,
                    tags: Vec::new(),
                    file: UploadedFile {
                        name: format!("update_{i}.pdf"),
                        declared_size: 1,
                        content: Bytes::from(vec![i]),
                    },
                })
                .await
                .unwrap()
                .version_number
        }));
    }

    let mut numbers = Vec::new();
    for handle in handles {
        numbers.push(handle.await.unwrap());
    }
    numbers.sort_unstable();
    assert_eq!(numbers, (2..=9).collect::<Vec<_>>());

    let history = vault.documents.versions(receipt.document_id).await.unwrap();
    assert_eq!(history.versions.len(), 9);
}

#[tokio::test]
async fn test_oversize_upload_leaves_no_trace() {
    let vault = vault_with_max(5).await;

    let err = vault
        .upload
        .upload(request(None, "Too Big", &["big"], "big.pdf", b"way over the limit"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::PayloadTooLarge);

    let listed = vault.documents.list(&Page::default()).await.unwrap();
    assert_eq!(listed.total, 0);

    // No document subtree was created under the storage root.
    let entries = std::fs::read_dir(&vault.storage_root).unwrap().count();
    assert_eq!(entries, 0);
}

#[tokio::test]
async fn test_unsupported_extension_creates_nothing() {
    let vault = vault().await;

    let err = vault
        .upload
        .upload(request(None, "Image", &[], "photo.png", b"not a document"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedType);

    let listed = vault.documents.list(&Page::default()).await.unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn test_upload_to_missing_document_is_not_found() {
    let vault = vault().await;

    let err = vault
        .upload
        .upload(request(Some(9999), "Ghost", &[], "ghost.pdf", b"x"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    let err = vault.documents.versions(9999).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_search_by_tags_text_and_type() {
    let vault = vault().await;

    let handbook = vault
        .upload
        .upload(request(
            None,
            "Employee Handbook",
            &["hr", "policy"],
            "handbook.pdf",
            b"handbook",
        ))
        .await
        .unwrap();
    let expenses = vault
        .upload
        .upload(request(
            None,
            "Expense Policy",
            &["finance", "policy"],
            "expenses.docx",
            b"expenses",
        ))
        .await
        .unwrap();
    let mut notes_req = request(None, "Meeting Notes", &["finance"], "notes.txt", b"notes");
    notes_req.description = Some("budget planning for next year".to_string());
    let notes = vault.upload.upload(notes_req).await.unwrap();

    // Any-of tag match.
    let found = vault
        .search
        .search(
            &SearchRequest {
                tags: vec!["policy".to_string()],
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(
        found.items.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![handbook.document_id, expenses.document_id]
    );

    // All-of requires every named tag.
    let found = vault
        .search
        .search(
            &SearchRequest {
                tags: vec!["hr".to_string(), "policy".to_string()],
                match_all: true,
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, handbook.document_id);

    // Text matches titles and descriptions, case-insensitively.
    let found = vault
        .search
        .search(
            &SearchRequest {
                query: Some("BUDGET".to_string()),
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, notes.document_id);

    // File type filters on the latest version.
    let found = vault
        .search
        .search(
            &SearchRequest {
                file_type: Some("txt".to_string()),
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, notes.document_id);

    // Criteria AND-combine.
    let found = vault
        .search
        .search(
            &SearchRequest {
                tags: vec!["finance".to_string()],
                file_type: Some("docx".to_string()),
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.items[0].id, expenses.document_id);

    // An unknown file type is rejected up front.
    let err = vault
        .search
        .search(
            &SearchRequest {
                file_type: Some("exe".to_string()),
                ..Default::default()
            },
            &Page::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedType);
}

#[tokio::test]
async fn test_delete_removes_stored_files() {
    let vault = vault().await;

    let receipt = vault
        .upload
        .upload(request(None, "Ephemeral", &[], "file.txt", b"bytes"))
        .await
        .unwrap();
    vault
        .upload
        .upload(request(Some(receipt.document_id), "Ephemeral", &[], "file.txt", b"more"))
        .await
        .unwrap();

    let subtree = vault.storage_root.join(receipt.document_id.to_string());
    assert_eq!(std::fs::read_dir(&subtree).unwrap().count(), 2);

    vault.documents.delete(receipt.document_id).await.unwrap();
    assert!(!subtree.exists());
}
