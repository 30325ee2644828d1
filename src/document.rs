//! Uploaded-document model and format classification.
//!
//! The pipeline never trusts the declared MIME type alone: browsers and
//! upstream proxies routinely mislabel uploads (`application/octet-stream`
//! for everything, `image/jpg`, a PDF posted as `image/png`). Classification
//! therefore reconciles the declared type with the file's magic bytes, and
//! the magic bytes win whenever the two disagree.

use crate::error::ExtractError;

/// An uploaded document as received from the caller.
///
/// Immutable input: the pipeline only reads it. The caller keeps ownership
/// of the buffer; for image uploads the original bytes are echoed back
/// untouched in the result.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
    /// MIME type as declared by the uploader (may be wrong or empty).
    pub mime_type: String,
    /// Original filename, kept for logging only.
    pub filename: String,
}

impl UploadedDocument {
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        mime_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }
}

/// What the upload actually is, as far as the pipeline is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// A PDF document — enters the extraction state machine.
    Pdf,
    /// A raster image with its canonical MIME type — bypasses extraction
    /// and is forwarded as-is.
    Image { mime_type: String },
}

/// Classify an upload from its declared MIME type and magic bytes.
///
/// Returns [`ExtractError::UnsupportedFormat`] when the bytes match no
/// known container, regardless of what the uploader claimed.
pub fn classify(doc: &UploadedDocument) -> Result<DocumentKind, ExtractError> {
    if let Some(kind) = sniff(&doc.bytes) {
        return Ok(kind);
    }

    // Magic bytes were inconclusive; fall back to a trustworthy-looking
    // declared type. Truncated-but-declared PDFs still fail later in the
    // native stage, which is non-fatal by design.
    match doc.mime_type.to_ascii_lowercase().as_str() {
        "application/pdf" => Ok(DocumentKind::Pdf),
        m if m.starts_with("image/") => Ok(DocumentKind::Image {
            mime_type: doc.mime_type.clone(),
        }),
        _ => Err(ExtractError::UnsupportedFormat {
            declared: doc.mime_type.clone(),
            sniffed: "unknown".into(),
        }),
    }
}

/// Identify a container from its magic bytes alone.
fn sniff(bytes: &[u8]) -> Option<DocumentKind> {
    if bytes.starts_with(b"%PDF") {
        return Some(DocumentKind::Pdf);
    }

    let mime = if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        "image/gif"
    } else if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        "image/tiff"
    } else if bytes.starts_with(b"BM") && bytes.len() > 26 {
        "image/bmp"
    } else {
        return None;
    };

    Some(DocumentKind::Image {
        mime_type: mime.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(bytes: &[u8], mime: &str) -> UploadedDocument {
        UploadedDocument::new(bytes.to_vec(), mime, "upload.bin")
    }

    #[test]
    fn pdf_magic_wins_over_declared_type() {
        let d = doc(b"%PDF-1.4 rest of file", "image/png");
        assert_eq!(classify(&d).unwrap(), DocumentKind::Pdf);
    }

    #[test]
    fn png_magic_detected() {
        let d = doc(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0], "application/octet-stream");
        assert_eq!(
            classify(&d).unwrap(),
            DocumentKind::Image {
                mime_type: "image/png".into()
            }
        );
    }

    #[test]
    fn jpeg_magic_detected() {
        let d = doc(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], "image/jpeg");
        assert!(matches!(classify(&d).unwrap(), DocumentKind::Image { mime_type } if mime_type == "image/jpeg"));
    }

    #[test]
    fn declared_pdf_without_magic_still_pdf() {
        // Truncated upload: no magic, but the declared type is specific.
        let d = doc(b"not really", "application/pdf");
        assert_eq!(classify(&d).unwrap(), DocumentKind::Pdf);
    }

    #[test]
    fn declared_image_without_magic_keeps_declared_mime() {
        let d = doc(b"not really", "image/heic");
        assert!(matches!(classify(&d).unwrap(), DocumentKind::Image { mime_type } if mime_type == "image/heic"));
    }

    #[test]
    fn unknown_bytes_and_type_rejected() {
        let d = doc(b"hello world", "text/plain");
        assert!(matches!(
            classify(&d),
            Err(ExtractError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn empty_upload_rejected() {
        let d = doc(b"", "");
        assert!(classify(&d).is_err());
    }
}
