//! Tag entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A shared, reusable label attached to documents many-to-many.
///
/// Names are unique case-insensitively; the stored `name` keeps the
/// display form from the first insertion. Tags are never deleted
/// automatically, so a tag may outlive its last association.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    /// Unique tag identifier.
    pub id: i64,
    /// Display name, unique case-insensitively.
    pub name: String,
}
