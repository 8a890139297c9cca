//! Best-effort plain-text extraction for the non-PDF container formats the
//! format analyser recognises. `spec.md` §4.2: "For all other formats,
//! assume a text layer exists" — this module is what actually produces that
//! text layer for DOCX/XLSX/CSV/HTML/plain-text/email.
//!
//! Parse failures degrade to an empty text layer per `spec.md` §7, they
//! never propagate out of the format analyser.

use crate::types::DocumentFormat;
use tracing::warn;

/// Extract a plain-text rendering of `bytes` for the given format. Returns
/// `None` when extraction isn't applicable (image formats have no text
/// layer of their own) or fails.
pub fn extract_text(format: DocumentFormat, bytes: &[u8]) -> Option<String> {
    match format {
        DocumentFormat::PlainText | DocumentFormat::Csv => {
            String::from_utf8(bytes.to_vec()).ok()
        }
        DocumentFormat::Html => extract_html(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::Xlsx => extract_xlsx(bytes),
        DocumentFormat::Email => extract_email(bytes),
        DocumentFormat::Image | DocumentFormat::PdfNative | DocumentFormat::PdfScanned | DocumentFormat::PdfHybrid => {
            None
        }
    }
}

#[cfg(feature = "html")]
fn extract_html(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8(bytes.to_vec()).ok()?;
    match html_to_markdown_rs::convert(&text, None) {
        Ok(markdown) => Some(markdown),
        Err(err) => {
            warn!(error = %err, "html-to-markdown conversion failed, degrading to empty text layer");
            None
        }
    }
}

#[cfg(not(feature = "html"))]
fn extract_html(bytes: &[u8]) -> Option<String> {
    String::from_utf8(bytes.to_vec()).ok()
}

#[cfg(feature = "office")]
fn extract_docx(bytes: &[u8]) -> Option<String> {
    use std::io::{Cursor, Read};

    let cursor = Cursor::new(bytes);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(archive) => archive,
        Err(err) => {
            warn!(error = %err, "docx is not a valid zip container");
            return None;
        }
    };

    let mut xml = String::new();
    let mut doc = archive.by_name("word/document.xml").ok()?;
    doc.read_to_string(&mut xml).ok()?;
    drop(doc);

    Some(extract_text_from_wordml(&xml))
}

#[cfg(feature = "office")]
fn extract_text_from_wordml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"p" => {
                if !out.is_empty() {
                    out.push('\n');
                }
            }
            Ok(Event::Text(e)) if in_text => {
                if let Ok(text) = e.unescape() {
                    out.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

#[cfg(not(feature = "office"))]
fn extract_docx(_bytes: &[u8]) -> Option<String> {
    None
}

#[cfg(feature = "excel")]
fn extract_xlsx(bytes: &[u8]) -> Option<String> {
    use calamine::{Reader, Xlsx};
    use std::io::Cursor;

    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook: Xlsx<_> = match Xlsx::new(cursor) {
        Ok(wb) => wb,
        Err(err) => {
            warn!(error = %err, "failed to open xlsx workbook");
            return None;
        }
    };

    let mut out = String::new();
    for sheet_name in workbook.sheet_names().to_owned() {
        if let Ok(range) = workbook.worksheet_range(&sheet_name) {
            for row in range.rows() {
                let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
                out.push_str(&cells.join("\t"));
                out.push('\n');
            }
        }
    }
    Some(out)
}

#[cfg(not(feature = "excel"))]
fn extract_xlsx(_bytes: &[u8]) -> Option<String> {
    None
}

#[cfg(feature = "email")]
fn extract_email(bytes: &[u8]) -> Option<String> {
    let message = mail_parser::MessageParser::default().parse(bytes)?;
    let subject = message.subject().unwrap_or_default();
    let body = message
        .body_text(0)
        .map(|cow| cow.to_string())
        .unwrap_or_default();
    Some(format!("{subject}\n{body}"))
}

#[cfg(not(feature = "email"))]
fn extract_email(_bytes: &[u8]) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passthrough() {
        let text = extract_text(DocumentFormat::PlainText, b"hello world").unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn image_has_no_text_layer() {
        assert!(extract_text(DocumentFormat::Image, b"\xff\xd8").is_none());
    }
}
