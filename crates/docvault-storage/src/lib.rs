//! # docvault-storage
//!
//! Local filesystem payload store. Each document owns one subtree under
//! the configured storage root; version payloads are written atomically
//! under generated names that never derive from client input.

pub mod path;
pub mod store;

pub use store::{ByteStream, FileStore, StoredFile};
