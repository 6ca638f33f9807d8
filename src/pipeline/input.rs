//! Input loading: read a report file from disk into an [`UploadedDocument`].
//!
//! The kind is taken from the filename extension only. Magic bytes are
//! deliberately not checked: a `.pdf` that is really a PNG goes down the
//! PDF path and comes back as a malformed-input placeholder, which is the
//! behaviour callers see for every other unreadable upload.

use crate::error::MedLensError;
use crate::output::UploadedDocument;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Read `path` into memory and classify it.
pub async fn load_document(path: impl AsRef<Path>) -> Result<UploadedDocument, MedLensError> {
    let path = path.as_ref();

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => MedLensError::FileNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => MedLensError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => MedLensError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let filename = display_name(path);
    let document = UploadedDocument::new(filename, bytes);

    if !document.kind().is_supported() {
        warn!(
            "'{}' has an unrecognised extension; treating it as an image",
            document.filename()
        );
    }
    debug!(
        "Loaded '{}': {} bytes, kind={}",
        document.filename(),
        document.bytes().len(),
        document.kind()
    );

    Ok(document)
}

/// The final path component, as the upload's original filename.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Filename extensions advertised to users.
pub const ACCEPTED_EXTENSIONS: [&str; 5] = ["pdf", "png", "jpg", "jpeg", "txt"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::DocumentKind;
    use std::path::PathBuf;

    #[test]
    fn display_name_strips_directories() {
        assert_eq!(display_name(Path::new("/tmp/in/report.pdf")), "report.pdf");
        assert_eq!(display_name(Path::new("scan.PNG")), "scan.PNG");
    }

    #[test]
    fn accepted_extensions_map_to_supported_kinds() {
        for ext in ACCEPTED_EXTENSIONS {
            let kind = DocumentKind::from_filename(&format!("file.{ext}"));
            assert!(kind.is_supported(), "{ext} should be accepted");
        }
        assert!(!DocumentKind::from_filename("file.docx").is_supported());
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load_document(PathBuf::from("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, MedLensError::FileNotFound { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn loads_bytes_and_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labs.TXT");
        std::fs::write(&path, "Hb 13.2 g/dL").unwrap();

        let doc = load_document(&path).await.unwrap();
        assert_eq!(doc.filename(), "labs.TXT");
        assert_eq!(doc.kind(), DocumentKind::Text);
        assert_eq!(doc.bytes(), b"Hb 13.2 g/dL");
    }
}
