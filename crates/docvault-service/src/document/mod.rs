//! Document services: upload, download, listing, deletion, and search.

pub mod download;
pub mod locks;
pub mod search;
pub mod service;
pub mod upload;

pub use download::{DownloadResult, DownloadService};
pub use locks::DocumentLocks;
pub use search::{SearchRequest, SearchService};
pub use service::DocumentService;
pub use upload::{parse_tag_list, UploadReceipt, UploadRequest, UploadService, UploadedFile};
