pub mod repository;
pub mod service;

/// Cap on the amount of extracted text carried into the search index.
const MAX_INDEXED_CONTENT_BYTES: usize = 512 * 1024;

/// Derives the storage key for a document. Computed once at creation and
/// frozen into the row; never reused after a hard delete.
/// Format: `{organizationId}/originals/{documentId}[.{ext}]`, the extension
/// omitted when the original filename carries none.
pub fn derive_storage_key(organization_id: &str, document_id: &str, original_name: &str) -> String {
    match file_extension(original_name) {
        Some(ext) => format!("{organization_id}/originals/{document_id}.{ext}"),
        None => format!("{organization_id}/originals/{document_id}"),
    }
}

/// Extension of a filename, if it has a meaningful one. A bare trailing dot
/// or a leading-dot name like `.env` yields no extension.
pub fn file_extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext)
}

/// Extracts plain text for the full-text index. Only textual payloads are
/// indexed; binary formats contribute an empty content column and remain
/// searchable by name.
pub fn extract_text_content(mime_type: &str, bytes: &[u8]) -> String {
    if !mime_type.starts_with("text/") && mime_type != "application/json" {
        return String::new();
    }
    let end = bytes.len().min(MAX_INDEXED_CONTENT_BYTES);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_includes_extension() {
        assert_eq!(
            derive_storage_key("org_1", "doc_2", "invoice.pdf"),
            "org_1/originals/doc_2.pdf"
        );
    }

    #[test]
    fn storage_key_omits_missing_extension() {
        assert_eq!(
            derive_storage_key("org_1", "doc_2", "README"),
            "org_1/originals/doc_2"
        );
        assert_eq!(
            derive_storage_key("org_1", "doc_2", "archive."),
            "org_1/originals/doc_2"
        );
    }

    #[test]
    fn extension_handling_edge_cases() {
        assert_eq!(file_extension("report.tar.gz"), Some("gz"));
        assert_eq!(file_extension(".env"), None);
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn extracts_text_only_for_textual_mime_types() {
        assert_eq!(extract_text_content("text/plain", b"lorem ipsum"), "lorem ipsum");
        assert_eq!(extract_text_content("application/pdf", b"%PDF-1.7"), "");
    }
}
