//! Document version entity and the file type allow-set.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use docvault_core::error::AppError;

/// One immutable uploaded payload plus its metadata.
///
/// Version numbers are allocated per document, start at 1, and are never
/// reused; only a whole-document delete removes version rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentVersion {
    /// Unique version identifier.
    pub id: i64,
    /// The document this version belongs to.
    pub document_id: i64,
    /// Monotonic version number within the document (1-based).
    pub version_number: i32,
    /// Storage-relative path of the payload. Always generated, never
    /// derived from client input.
    pub file_path: String,
    /// The filename the client supplied at upload. Display metadata only.
    pub original_filename: String,
    /// Payload size in bytes, measured from the stored file.
    pub file_size: i64,
    /// File type of the payload.
    pub file_type: FileKind,
    /// When the version was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

/// The fixed allow-set of accepted file types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum FileKind {
    /// Portable Document Format.
    Pdf,
    /// Office Open XML word processing document.
    Docx,
    /// Legacy Microsoft Word document.
    Doc,
    /// Plain text.
    Txt,
}

impl FileKind {
    /// Every accepted file kind, in display order.
    pub const ALL: [FileKind; 4] = [Self::Pdf, Self::Docx, Self::Doc, Self::Txt];

    /// Parse from a bare extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "doc" => Some(Self::Doc),
            "txt" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Derive the kind from a client filename's extension.
    ///
    /// Returns `None` when the extension is missing or not in the
    /// allow-set. A name like `"archive"` has no extension; `"a.b.pdf"`
    /// resolves via its final component.
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = name.rsplit('.').next().filter(|e| *e != name)?;
        Self::from_extension(ext)
    }

    /// Canonical lowercase extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
        }
    }

    /// MIME type for transport metadata.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Txt => "text/plain",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim().trim_start_matches('.')).ok_or_else(|| {
            AppError::unsupported_type(format!(
                "File type '{s}' is not allowed (allowed: pdf, docx, doc, txt)"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_filename() {
        assert_eq!(FileKind::from_filename("report.pdf"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("REPORT.PDF"), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_filename("a.b.docx"), Some(FileKind::Docx));
        assert_eq!(FileKind::from_filename("noextension"), None);
        assert_eq!(FileKind::from_filename("image.png"), None);
    }

    #[test]
    fn test_from_str_accepts_leading_dot() {
        assert_eq!(".pdf".parse::<FileKind>().unwrap(), FileKind::Pdf);
        assert!("exe".parse::<FileKind>().is_err());
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(FileKind::Pdf.mime_type(), "application/pdf");
        assert_eq!(FileKind::Txt.mime_type(), "text/plain");
    }
}
