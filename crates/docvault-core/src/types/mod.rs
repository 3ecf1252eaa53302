//! Core type definitions used across the DocVault workspace.

pub mod filter;
pub mod pagination;

pub use filter::DocumentFilter;
pub use pagination::{Page, PageResponse};
