//! Safe storage path derivation and validation.
//!
//! Every stored payload lives at `<root>/<document_id>/<generated name>`.
//! Paths handed back to the metadata store are storage-relative; anything
//! coming back in for a read is re-validated before it touches the
//! filesystem.

use std::path::{Component, Path};

use tracing::warn;
use uuid::Uuid;

use docvault_core::error::AppError;
use docvault_core::result::AppResult;
use docvault_entity::document::version::FileKind;

/// The subtree name for one document's versions.
pub fn document_prefix(document_id: i64) -> String {
    document_id.to_string()
}

/// Generate the storage-relative path for a new version payload.
///
/// The filename is `v{n}_{uuid}.{ext}`: collision-proof, sortable by
/// version, and independent of the client-supplied name.
pub fn version_path(document_id: i64, version_number: i32, kind: FileKind) -> String {
    format!(
        "{}/v{}_{}.{}",
        document_id,
        version_number,
        Uuid::new_v4(),
        kind.extension()
    )
}

/// Validate a storage-relative path.
///
/// Rejects absolute paths and any parent-directory component before any
/// filesystem access happens. Rejections are logged as security-relevant.
pub fn validate(path: &str) -> AppResult<()> {
    let p = Path::new(path);
    let escapes = p.components().any(|c| {
        !matches!(c, Component::Normal(_) | Component::CurDir)
    }) || path.is_empty();

    if escapes {
        warn!(path, "Rejected storage path escaping its subtree");
        return Err(AppError::invalid_path(format!(
            "Storage path '{path}' is not confined to its document subtree"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_path_shape() {
        let path = version_path(7, 3, FileKind::Pdf);
        assert!(path.starts_with("7/v3_"));
        assert!(path.ends_with(".pdf"));
    }

    #[test]
    fn test_generated_paths_are_unique() {
        assert_ne!(
            version_path(1, 1, FileKind::Txt),
            version_path(1, 1, FileKind::Txt)
        );
    }

    #[test]
    fn test_validate_rejects_escapes() {
        assert!(validate("1/v1_abc.pdf").is_ok());
        assert!(validate("../etc/passwd").is_err());
        assert!(validate("1/../../etc/passwd").is_err());
        assert!(validate("/etc/passwd").is_err());
        assert!(validate("").is_err());
    }
}
