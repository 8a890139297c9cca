//! MIME type detection, used by the format analyser (Tier 0) to classify a
//! document container before any text is read.

use crate::error::{CertScanError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

pub const HTML_MIME_TYPE: &str = "text/html";
pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const EXCEL_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const EML_MIME_TYPE: &str = "message/rfc822";
pub const CSV_MIME_TYPE: &str = "text/csv";

/// Extension to MIME type mapping for the container formats the format
/// analyser recognises (`spec.md` §3 "Document Format").
static EXT_TO_MIME: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("txt", PLAIN_TEXT_MIME_TYPE);
    m.insert("pdf", PDF_MIME_TYPE);
    m.insert("html", HTML_MIME_TYPE);
    m.insert("htm", HTML_MIME_TYPE);
    m.insert("xlsx", EXCEL_MIME_TYPE);
    m.insert("docx", DOCX_MIME_TYPE);
    m.insert("csv", CSV_MIME_TYPE);
    m.insert("eml", EML_MIME_TYPE);
    m.insert("bmp", "image/bmp");
    m.insert("gif", "image/gif");
    m.insert("jpg", "image/jpeg");
    m.insert("jpeg", "image/jpeg");
    m.insert("png", "image/png");
    m.insert("tiff", "image/tiff");
    m.insert("tif", "image/tiff");
    m.insert("webp", "image/webp");
    m
});

/// Detect a MIME type from a filename extension, falling back to the
/// `mime_guess` crate. Per `spec.md` §4.2: "if generic or unknown, fall back
/// to the filename extension."
pub fn detect_mime_from_filename(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())?;

    if let Some(mime) = EXT_TO_MIME.get(ext.as_str()) {
        return Some((*mime).to_string());
    }

    mime_guess::from_path(filename).first().map(|m| m.to_string())
}

/// Detect a MIME type from raw bytes using magic-byte sniffing, with a
/// ZIP-container probe to distinguish DOCX/XLSX from a plain ZIP archive.
pub fn detect_mime_from_bytes(content: &[u8]) -> Result<String> {
    if let Some(kind) = infer::get(content) {
        let mime_type = kind.mime_type();
        if mime_type == "application/zip"
            && let Some(office_mime) = detect_office_format_from_zip(content)
        {
            return Ok(office_mime.to_string());
        }
        return Ok(mime_type.to_string());
    }

    if let Ok(text) = std::str::from_utf8(content) {
        let trimmed = text.trim_start();
        if trimmed.starts_with("%PDF") {
            return Ok(PDF_MIME_TYPE.to_string());
        }
        if trimmed.starts_with("<!DOCTYPE html") || trimmed.starts_with("<html") {
            return Ok(HTML_MIME_TYPE.to_string());
        }
        return Ok(PLAIN_TEXT_MIME_TYPE.to_string());
    }

    Err(CertScanError::UnsupportedFormat(
        "could not determine MIME type from bytes".to_string(),
    ))
}

/// Scan a ZIP's local file headers for OOXML marker files without fully
/// parsing the archive.
fn detect_office_format_from_zip(content: &[u8]) -> Option<&'static str> {
    const DOCX_MARKER: &[u8] = b"word/document.xml";
    const XLSX_MARKER: &[u8] = b"xl/workbook.xml";

    if contains_subsequence(content, DOCX_MARKER) {
        return Some(DOCX_MIME_TYPE);
    }
    if contains_subsequence(content, XLSX_MARKER) {
        return Some(EXCEL_MIME_TYPE);
    }
    None
}

#[inline]
fn contains_subsequence(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Resolve a MIME type for a document, preferring the declared MIME, then
/// content sniffing, then the filename extension — the order `spec.md` §4.2
/// implies ("map MIME to a format; if generic or unknown, fall back to the
/// filename extension").
pub fn resolve_mime(declared: Option<&str>, content: &[u8], filename: &str) -> String {
    if let Some(mime) = declared
        && !mime.is_empty()
        && mime != "application/octet-stream"
    {
        return mime.to_string();
    }

    if let Ok(sniffed) = detect_mime_from_bytes(content)
        && sniffed != "application/octet-stream"
        && sniffed != PLAIN_TEXT_MIME_TYPE
    {
        return sniffed;
    }

    detect_mime_from_filename(filename).unwrap_or_else(|| PLAIN_TEXT_MIME_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_extension_wins_over_guess_table() {
        assert_eq!(detect_mime_from_filename("cert.pdf").as_deref(), Some(PDF_MIME_TYPE));
        assert_eq!(detect_mime_from_filename("report.docx").as_deref(), Some(DOCX_MIME_TYPE));
    }

    #[test]
    fn sniffs_pdf_magic_bytes() {
        let bytes = b"%PDF-1.7\n...";
        assert_eq!(detect_mime_from_bytes(bytes).unwrap(), PDF_MIME_TYPE);
    }

    #[test]
    fn resolve_prefers_declared_mime() {
        let resolved = resolve_mime(Some("application/pdf"), b"irrelevant", "foo.txt");
        assert_eq!(resolved, PDF_MIME_TYPE);
    }

    #[test]
    fn resolve_falls_back_to_filename() {
        let resolved = resolve_mime(None, b"", "cert.docx");
        assert_eq!(resolved, DOCX_MIME_TYPE);
    }
}
