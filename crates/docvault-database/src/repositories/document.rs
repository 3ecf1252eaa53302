//! Document repository implementation.
//!
//! Owns documents, their version rows, and the document-tag association.
//! Version recording and cascading deletes are explicit transactions; no
//! behavior relies on implicit cascade triggers.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use docvault_core::error::{AppError, ErrorKind};
use docvault_core::result::AppResult;
use docvault_core::types::filter::DocumentFilter;
use docvault_core::types::pagination::{Page, PageResponse};
use docvault_entity::document::model::{Document, DocumentSummary};
use docvault_entity::document::tag::Tag;
use docvault_entity::document::version::{DocumentVersion, FileKind};

use super::tag::upsert_tag;

/// Data required to record a new version row.
#[derive(Debug, Clone)]
pub struct NewVersion<'a> {
    /// The owning document.
    pub document_id: i64,
    /// The allocated version number.
    pub version_number: i32,
    /// Storage-relative path of the stored payload.
    pub file_path: &'a str,
    /// Client-supplied filename, kept as display metadata.
    pub original_filename: &'a str,
    /// Actual stored payload size in bytes.
    pub file_size: i64,
    /// File type of the payload.
    pub file_type: FileKind,
}

/// Descriptive metadata refreshed alongside a version upload.
#[derive(Debug, Clone)]
pub struct MetadataRefresh<'a> {
    /// Replacement title.
    pub title: &'a str,
    /// Replacement description; `None` leaves the stored value untouched.
    pub description: Option<&'a str>,
}

/// Repository for document, version, and association CRUD and queries.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Create a new document repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a document record.
    ///
    /// The caller is responsible for removing the record again if the
    /// first upload does not complete; a document with zero versions must
    /// not outlive its upload.
    pub async fn create(&self, title: &str, description: Option<&str>) -> AppResult<Document> {
        sqlx::query_as::<_, Document>(
            "INSERT INTO documents (title, description, created_at) \
             VALUES (?, ?, ?) RETURNING *",
        )
        .bind(title)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create document", e))
    }

    /// Find a document by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<Document>> {
        sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find document", e))
    }

    /// Next version number for a document: `MAX(version_number) + 1`,
    /// starting at 1.
    ///
    /// Callers must hold the document's upload lock between this call and
    /// [`record_version`](Self::record_version); the UNIQUE constraint on
    /// `(document_id, version_number)` backs the allocation against races.
    pub async fn next_version_number(&self, document_id: i64) -> AppResult<i32> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(version_number), 0) + 1 FROM document_versions WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to allocate version number", e)
        })
    }

    /// Record a version row, replace the document's tag set, and
    /// optionally refresh title/description, in one transaction.
    ///
    /// Uploads always replace the tag set with the names supplied in the
    /// request; tag rows themselves are shared and never deleted here.
    /// A refreshed description of `None` leaves the stored value alone
    /// (an empty string clears it).
    pub async fn record_version(
        &self,
        version: &NewVersion<'_>,
        tags: &[String],
        refresh: Option<MetadataRefresh<'_>>,
    ) -> AppResult<DocumentVersion> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        if let Some(refresh) = refresh {
            sqlx::query(
                "UPDATE documents SET title = ?, description = COALESCE(?, description) WHERE id = ?",
            )
            .bind(refresh.title)
            .bind(refresh.description)
            .bind(version.document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to refresh document metadata", e)
            })?;
        }

        let row = sqlx::query_as::<_, DocumentVersion>(
            "INSERT INTO document_versions \
             (document_id, version_number, file_path, original_filename, file_size, file_type, uploaded_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(version.document_id)
        .bind(version.version_number)
        .bind(version.file_path)
        .bind(version.original_filename)
        .bind(version.file_size)
        .bind(version.file_type)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::conflict(format!(
                    "Version {} already exists for document {}",
                    version.version_number, version.document_id
                ))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to record version", e),
        })?;

        sqlx::query("DELETE FROM document_tags WHERE document_id = ?")
            .bind(version.document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to clear tag associations", e)
            })?;

        for name in tags {
            let tag = upsert_tag(&mut *tx, name).await?;
            sqlx::query("INSERT OR IGNORE INTO document_tags (document_id, tag_id) VALUES (?, ?)")
                .bind(version.document_id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to associate tag", e)
                })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit version", e)
        })?;

        Ok(row)
    }

    /// All versions of a document, ordered by version number ascending.
    pub async fn find_versions(&self, document_id: i64) -> AppResult<Vec<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = ? ORDER BY version_number ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list versions", e))
    }

    /// Find a specific version of a document.
    pub async fn find_version(
        &self,
        document_id: i64,
        version_number: i32,
    ) -> AppResult<Option<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = ? AND version_number = ?",
        )
        .bind(document_id)
        .bind(version_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find version", e))
    }

    /// The version with the highest version number, if any.
    pub async fn find_latest_version(
        &self,
        document_id: i64,
    ) -> AppResult<Option<DocumentVersion>> {
        sqlx::query_as::<_, DocumentVersion>(
            "SELECT * FROM document_versions WHERE document_id = ? \
             ORDER BY version_number DESC LIMIT 1",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find latest version", e))
    }

    /// List documents matching a filter, with latest version, tags, and
    /// version count, paginated.
    ///
    /// An empty filter yields the full listing. Results are ordered by
    /// document ID ascending (creation order), so advancing `skip` over an
    /// unchanged store never skips or repeats a row.
    pub async fn query(
        &self,
        filter: &DocumentFilter,
        page: &Page,
    ) -> AppResult<PageResponse<DocumentSummary>> {
        let total: i64 = {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM documents d");
            push_criteria(&mut qb, filter);
            qb.build_query_scalar()
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to count documents", e)
                })?
        };

        let documents: Vec<Document> = {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT d.id, d.title, d.description, d.created_at FROM documents d",
            );
            push_criteria(&mut qb, filter);
            qb.push(" ORDER BY d.id ASC LIMIT ");
            qb.push_bind(page.limit() as i64);
            qb.push(" OFFSET ");
            qb.push_bind(page.offset() as i64);
            qb.build_query_as()
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to list documents", e)
                })?
        };

        let summaries = self.load_summaries(documents).await?;
        Ok(PageResponse::new(summaries, total as u64, page))
    }

    /// Delete a document with all its versions and tag associations.
    ///
    /// Explicit ordered deletes in one transaction: associations, then
    /// versions, then the document row. Tag rows are never touched.
    /// Returns false when the document did not exist.
    pub async fn delete(&self, document_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("DELETE FROM document_tags WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete tag associations", e)
            })?;

        sqlx::query("DELETE FROM document_versions WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete versions", e)
            })?;

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to delete document", e)
            })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit delete", e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Batch-load latest versions, tags, and version counts for a page of
    /// documents and assemble summaries, preserving input order.
    async fn load_summaries(&self, documents: Vec<Document>) -> AppResult<Vec<DocumentSummary>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = documents.iter().map(|d| d.id).collect();

        let latest: Vec<DocumentVersion> = {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT v.id, v.document_id, v.version_number, v.file_path, v.original_filename, \
                 v.file_size, v.file_type, v.uploaded_at \
                 FROM document_versions v WHERE v.version_number = \
                 (SELECT MAX(v2.version_number) FROM document_versions v2 \
                  WHERE v2.document_id = v.document_id) \
                 AND v.document_id IN (",
            );
            push_id_list(&mut qb, &ids);
            qb.push(")");
            qb.build_query_as().fetch_all(&self.pool).await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load latest versions", e)
            })?
        };

        let counts: Vec<(i64, i64)> = {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT document_id, COUNT(*) FROM document_versions WHERE document_id IN (",
            );
            push_id_list(&mut qb, &ids);
            qb.push(") GROUP BY document_id");
            qb.build_query_as().fetch_all(&self.pool).await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count versions", e)
            })?
        };

        let tag_rows: Vec<(i64, i64, String)> = {
            let mut qb = QueryBuilder::<Sqlite>::new(
                "SELECT dt.document_id, t.id, t.name FROM document_tags dt \
                 JOIN tags t ON t.id = dt.tag_id WHERE dt.document_id IN (",
            );
            push_id_list(&mut qb, &ids);
            qb.push(") ORDER BY t.id ASC");
            qb.build_query_as().fetch_all(&self.pool).await.map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to load document tags", e)
            })?
        };

        let mut summaries: Vec<DocumentSummary> = documents
            .into_iter()
            .map(|d| DocumentSummary {
                id: d.id,
                title: d.title,
                description: d.description,
                created_at: d.created_at,
                latest_version: None,
                tags: Vec::new(),
                version_count: 0,
            })
            .collect();

        for version in latest {
            if let Some(s) = summaries.iter_mut().find(|s| s.id == version.document_id) {
                s.latest_version = Some(version);
            }
        }
        for (document_id, count) in counts {
            if let Some(s) = summaries.iter_mut().find(|s| s.id == document_id) {
                s.version_count = count;
            }
        }
        for (document_id, tag_id, name) in tag_rows {
            if let Some(s) = summaries.iter_mut().find(|s| s.id == document_id) {
                s.tags.push(Tag { id: tag_id, name });
            }
        }

        Ok(summaries)
    }
}

/// Append WHERE clauses for a document filter.
fn push_criteria(qb: &mut QueryBuilder<'_, Sqlite>, filter: &DocumentFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(text) = &filter.text {
        let pattern = format!("%{}%", text.to_lowercase());
        qb.push(" AND (lower(d.title) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR (d.description IS NOT NULL AND lower(d.description) LIKE ");
        qb.push_bind(pattern);
        qb.push("))");
    }

    if !filter.tags.is_empty() {
        qb.push(
            " AND d.id IN (SELECT dt.document_id FROM document_tags dt \
             JOIN tags t ON t.id = dt.tag_id WHERE lower(t.name) IN (",
        );
        {
            let mut separated = qb.separated(", ");
            for name in &filter.tags {
                separated.push_bind(name.clone());
            }
        }
        qb.push(") GROUP BY dt.document_id");
        if filter.match_all {
            qb.push(" HAVING COUNT(DISTINCT dt.tag_id) = ");
            qb.push_bind(filter.tags.len() as i64);
        }
        qb.push(")");
    }

    if let Some(file_type) = &filter.file_type {
        qb.push(
            " AND d.id IN (SELECT v.document_id FROM document_versions v \
             WHERE v.file_type = ",
        );
        qb.push_bind(file_type.clone());
        qb.push(
            " AND v.version_number = (SELECT MAX(v2.version_number) \
             FROM document_versions v2 WHERE v2.document_id = v.document_id))",
        );
    }
}

/// Append a comma-separated bound ID list.
fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
}
