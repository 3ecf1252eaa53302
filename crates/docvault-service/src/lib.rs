//! # docvault-service
//!
//! Business logic service layer for DocVault. Each service orchestrates
//! the document repositories and the file store to implement an
//! application-level use case: upload, download, listing, deletion,
//! search.
//!
//! Services follow constructor injection — all dependencies are provided
//! at construction time via `Arc` references.

pub mod document;

pub use document::{
    DocumentLocks, DocumentService, DownloadResult, DownloadService, SearchRequest, SearchService,
    UploadReceipt, UploadRequest, UploadService, UploadedFile,
};
