//! C2 — Format Analyser (Tier 0).
//!
//! Always succeeds with confidence 1.0 (`spec.md` §4.2). Maps the declared
//! MIME/filename to a `DocumentFormat`, extracts a text layer, scores PDF
//! text quality to decide native/scanned/hybrid, and delegates certificate
//! type detection to [`crate::type_detector::TypeDetector`] (C3).

use crate::core::mime::{
    self, DOCX_MIME_TYPE, EML_MIME_TYPE, EXCEL_MIME_TYPE, HTML_MIME_TYPE, PDF_MIME_TYPE,
};
use crate::error::Result;
use crate::settings::SettingsStore;
use crate::text_layer;
use crate::type_detector::TypeDetector;
use crate::types::{DocumentClassification, DocumentFormat, FormatAnalysis};

/// Runs Tier 0 over a document's raw bytes.
pub async fn analyze(
    store: &dyn SettingsStore,
    bytes: &[u8],
    filename: &str,
    declared_mime: Option<&str>,
) -> Result<FormatAnalysis> {
    let resolved_mime = mime::resolve_mime(declared_mime, bytes, filename);
    let format = format_for_mime(&resolved_mime, filename);

    let (text_content, page_count, avg_chars_per_page, text_quality, is_scanned, is_hybrid) =
        if format.is_pdf() {
            analyze_pdf_text_layer(bytes)
        } else if format == DocumentFormat::Image {
            (None, 1, 0.0, 0.0, true, false)
        } else {
            let text = text_layer::extract_text(format, bytes);
            let chars = text.as_deref().map(str::len).unwrap_or(0);
            (text, 1, chars as f64, 1.0, false, false)
        };

    let detection = TypeDetector::detect(store, filename, text_content.as_deref()).await?;
    let classification = DocumentClassification::from_certificate_type(&detection.cert_type);

    Ok(FormatAnalysis {
        format,
        classification,
        detected_certificate_type: detection.cert_type,
        has_text_layer: text_content.is_some(),
        is_scanned,
        is_hybrid,
        text_content,
        page_count,
        text_quality,
        avg_chars_per_page,
    })
}

fn format_for_mime(mime_type: &str, filename: &str) -> DocumentFormat {
    if mime_type.starts_with("image/") {
        return DocumentFormat::Image;
    }
    match mime_type {
        PDF_MIME_TYPE => DocumentFormat::PdfNative,
        DOCX_MIME_TYPE => DocumentFormat::Docx,
        EXCEL_MIME_TYPE => DocumentFormat::Xlsx,
        HTML_MIME_TYPE => DocumentFormat::Html,
        EML_MIME_TYPE => DocumentFormat::Email,
        "text/csv" => DocumentFormat::Csv,
        "text/plain" => DocumentFormat::PlainText,
        _ => {
            // mime_guess occasionally resolves to a generic octet-stream for a
            // recognised extension; fall back to the extension one more time.
            let ext = std::path::Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase());
            match ext.as_deref() {
                Some("csv") => DocumentFormat::Csv,
                Some("eml") => DocumentFormat::Email,
                Some("docx") => DocumentFormat::Docx,
                Some("xlsx") => DocumentFormat::Xlsx,
                Some("html" | "htm") => DocumentFormat::Html,
                _ => DocumentFormat::PlainText,
            }
        }
    }
}

/// Extracts per-page text from a PDF, scores it per `spec.md` §4.2, and
/// classifies the container as native, scanned, or hybrid.
///
/// `avgCharsPerPage = totalChars / pageCount`;
/// `textQuality = min(1, (avg/500) * (wordCount/(pages*50)))`;
/// `isScanned = avg < 50 || textQuality < 0.1`; `isHybrid = 50 <= avg <= 100`.
#[cfg(feature = "pdf")]
fn analyze_pdf_text_layer(bytes: &[u8]) -> (Option<String>, u32, f64, f64, bool, bool) {
    use pdfium_render::prelude::*;
    use tracing::warn;

    let pdfium = match Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .or_else(|_| Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")).map(Pdfium::new))
    {
        Ok(pdfium) => pdfium,
        Err(err) => {
            warn!(error = %err, "failed to bind pdfium library, treating pdf as scanned");
            return (None, 1, 0.0, 0.0, true, false);
        }
    };

    let document = match pdfium.load_pdf_from_byte_slice(bytes, None) {
        Ok(doc) => doc,
        Err(err) => {
            warn!(error = %err, "failed to parse pdf, treating as scanned with no text layer");
            return (None, 1, 0.0, 0.0, true, false);
        }
    };

    let page_count = document.pages().len().max(1) as u32;

    let mut combined = String::new();
    for page in document.pages().iter() {
        if let Ok(text) = page.text() {
            combined.push_str(&text.all());
            combined.push('\n');
        }
    }

    let total_chars = combined.chars().count() as f64;
    let word_count = combined.split_whitespace().count() as f64;
    let avg_chars_per_page = total_chars / f64::from(page_count);
    let text_quality = ((avg_chars_per_page / 500.0) * (word_count / (f64::from(page_count) * 50.0)))
        .min(1.0)
        .max(0.0);

    let is_scanned = avg_chars_per_page < 50.0 || text_quality < 0.1;
    let is_hybrid = (50.0..=100.0).contains(&avg_chars_per_page);

    let text_content = if combined.trim().is_empty() { None } else { Some(combined) };
    (text_content, page_count, avg_chars_per_page, text_quality, is_scanned, is_hybrid)
}

#[cfg(not(feature = "pdf"))]
fn analyze_pdf_text_layer(_bytes: &[u8]) -> (Option<String>, u32, f64, f64, bool, bool) {
    (None, 1, 0.0, 0.0, true, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InMemorySettingsStore;
    use std::collections::HashMap;

    #[tokio::test]
    async fn plain_text_is_native_with_full_text_quality() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let analysis = analyze(&store, b"Landlord Gas Safety Record LGSR", "note.txt", None)
            .await
            .unwrap();
        assert_eq!(analysis.format, DocumentFormat::PlainText);
        assert!(analysis.has_text_layer);
        assert!(!analysis.is_scanned);
    }

    #[tokio::test]
    async fn image_is_always_scanned_single_page() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let analysis = analyze(&store, b"\xff\xd8\xff\xe0", "photo.jpg", Some("image/jpeg"))
            .await
            .unwrap();
        assert_eq!(analysis.format, DocumentFormat::Image);
        assert!(analysis.is_scanned);
        assert_eq!(analysis.page_count, 1);
        assert!(!analysis.has_text_layer);
    }

    #[tokio::test]
    async fn csv_resolves_even_without_declared_mime() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let analysis = analyze(&store, b"a,b,c\n1,2,3", "data.csv", None).await.unwrap();
        assert_eq!(analysis.format, DocumentFormat::Csv);
    }
}
