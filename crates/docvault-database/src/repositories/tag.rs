//! Tag repository implementation.

use sqlx::{SqliteConnection, SqlitePool};

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_entity::document::tag::Tag;

/// Upsert a tag by name on an existing connection.
///
/// The `tags.name` column is `COLLATE NOCASE UNIQUE`, so "Legal" and
/// "legal" resolve to the same row; the display form of the first
/// insertion is kept. Used inside the version-recording transaction.
pub(crate) async fn upsert_tag(conn: &mut SqliteConnection, name: &str) -> AppResult<Tag> {
    sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert tag", e))?;

    sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to fetch tag", e))
}

/// Repository for tag lookup and creation.
#[derive(Debug, Clone)]
pub struct TagRepository {
    pool: SqlitePool,
}

impl TagRepository {
    /// Create a new tag repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch an existing tag by name (case-insensitive) or create it.
    pub async fn get_or_create(&self, name: &str) -> AppResult<Tag> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to acquire connection", e))?;
        upsert_tag(&mut *conn, name).await
    }

    /// Find a tag by name, case-insensitively.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find tag", e))
    }

    /// List all tags associated with a document, in tag creation order.
    pub async fn find_by_document(&self, document_id: i64) -> AppResult<Vec<Tag>> {
        sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name FROM tags t \
             JOIN document_tags dt ON dt.tag_id = t.id \
             WHERE dt.document_id = ? ORDER BY t.id ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list document tags", e))
    }
}
