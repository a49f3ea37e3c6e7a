//! Page-count estimation from upload metadata
//!
//! Used only when a file's page count is unknown. The estimate is advisory:
//! it is a byte-size heuristic per document family and never fails.

use shared::FileSource;

/// Average bytes per page for a document family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    WordProcessor,
    Presentation,
    PlainText,
    Image,
    Other,
}

impl DocumentKind {
    fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        let essence = mime.split(';').next().unwrap_or_default().trim();
        match essence {
            "application/pdf" => Self::Pdf,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            | "application/rtf"
            | "application/vnd.oasis.opendocument.text" => Self::WordProcessor,
            "application/vnd.ms-powerpoint"
            | "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            | "application/vnd.oasis.opendocument.presentation" => Self::Presentation,
            "text/plain" | "text/markdown" | "text/csv" => Self::PlainText,
            other if other.starts_with("image/") => Self::Image,
            _ => Self::Other,
        }
    }

    fn bytes_per_page(self) -> Option<u64> {
        match self {
            Self::Pdf => Some(100_000),
            Self::WordProcessor => Some(25_000),
            Self::Presentation => Some(250_000),
            Self::PlainText => Some(3_000),
            // 一张图片打印一页
            Self::Image => None,
            Self::Other => Some(50_000),
        }
    }
}

/// MIME type of the upload, guessed from the file name when the client sent none
fn resolve_mime(source: &FileSource) -> Option<String> {
    match source.mime_type.as_deref().map(str::trim) {
        Some(mime) if !mime.is_empty() => Some(mime.to_string()),
        _ => mime_guess::from_path(&source.file_name)
            .first_raw()
            .map(str::to_string),
    }
}

/// Estimate how many pages `source` will print, at least 1.
pub fn estimate_page_count(source: &FileSource) -> u32 {
    let kind = resolve_mime(source)
        .map(|mime| DocumentKind::from_mime(&mime))
        .unwrap_or(DocumentKind::Other);

    let pages = match kind.bytes_per_page() {
        Some(per_page) => source.size_bytes.div_ceil(per_page),
        None => 1,
    };
    let pages = u32::try_from(pages).unwrap_or(u32::MAX).max(1);

    tracing::debug!(
        file = %source.file_name,
        size_bytes = source.size_bytes,
        kind = ?kind,
        pages,
        "Estimated page count"
    );
    pages
}

/// Page count of an optional source; a file with no metadata prints one page.
pub fn estimate_or_default(source: Option<&FileSource>) -> u32 {
    source.map(estimate_page_count).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, size: u64, mime: Option<&str>) -> FileSource {
        FileSource {
            file_name: name.to_string(),
            size_bytes: size,
            mime_type: mime.map(str::to_string),
        }
    }

    #[test]
    fn test_pdf_rounds_up() {
        assert_eq!(estimate_page_count(&source("thesis.pdf", 250_000, None)), 3);
        assert_eq!(estimate_page_count(&source("thesis.pdf", 200_000, None)), 2);
    }

    #[test]
    fn test_explicit_mime_wins_over_extension() {
        let file = source("scan.bin", 30_000, Some("text/plain; charset=utf-8"));
        assert_eq!(estimate_page_count(&file), 10);
    }

    #[test]
    fn test_image_is_one_page() {
        assert_eq!(estimate_page_count(&source("photo.JPG", 8_000_000, None)), 1);
    }

    #[test]
    fn test_minimum_one_page() {
        assert_eq!(estimate_page_count(&source("empty.pdf", 0, None)), 1);
        assert_eq!(estimate_page_count(&source("noext", 0, None)), 1);
        assert_eq!(estimate_or_default(None), 1);
    }

    #[test]
    fn test_unknown_type_uses_generic_rate() {
        assert_eq!(estimate_page_count(&source("archive", 120_000, None)), 3);
    }

    #[test]
    fn test_office_documents() {
        assert_eq!(estimate_page_count(&source("report.docx", 50_001, None)), 3);
        assert_eq!(estimate_page_count(&source("deck.pptx", 500_000, None)), 2);
    }
}
