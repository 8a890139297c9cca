//! C4 — QR & Metadata Harvester (Tier 0.5).
//!
//! Runs for scanned/image documents (`spec.md` §4.4): decodes QR codes via
//! `rqrr`, rasterising a PDF's first page with `pdfium-render` when the
//! input isn't already an image, matches payloads against the four known
//! compliance-registry URL shapes, and pulls EXIF metadata via
//! `kamadak-exif`. Parse failures degrade to an empty result — this tier
//! never aborts the pipeline (`spec.md` §7).

use crate::types::{DocumentFormat, ExifData, QrCode, QrMetadataResult, QrProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static GAS_SAFE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)gassaferegister\.co\.uk/check/([A-Z0-9]+)").unwrap());
static GAS_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)gastag\.(?:co\.uk|com)/(?:ref/)?([A-Z0-9-]+)").unwrap());
static NICEIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)niceic\.(?:com|co\.uk)/(?:verify|check)/([A-Z0-9-]+)").unwrap());
static CORGI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)corgi-?(?:home)?plan\.(?:com|co\.uk)/(?:verify|check)/([A-Z0-9-]+)").unwrap());

/// Runs the Tier 0.5 harvest over raw document bytes.
pub fn harvest(format: DocumentFormat, bytes: &[u8]) -> QrMetadataResult {
    let mut result = QrMetadataResult::default();

    let gray_image = match format {
        DocumentFormat::Image => decode_image(bytes),
        _ if format.is_pdf() => rasterize_first_pdf_page(bytes),
        _ => None,
    };

    if let Some(gray_image) = &gray_image {
        result.qr_codes = decode_qr_codes(gray_image);
    }

    if format == DocumentFormat::Image {
        result.exif = extract_exif(bytes);
    }

    populate_fields(&mut result);
    result
}

#[cfg(feature = "qr")]
fn decode_image(bytes: &[u8]) -> Option<image::GrayImage> {
    match image::load_from_memory(bytes) {
        Ok(img) => Some(img.to_luma8()),
        Err(err) => {
            warn!(error = %err, "failed to decode image bytes for qr scan");
            None
        }
    }
}

#[cfg(not(feature = "qr"))]
fn decode_image(_bytes: &[u8]) -> Option<image::GrayImage> {
    None
}

#[cfg(all(feature = "qr", feature = "pdf"))]
fn rasterize_first_pdf_page(bytes: &[u8]) -> Option<image::GrayImage> {
    use pdfium_render::prelude::*;

    let pdfium = Pdfium::bind_to_system_library().map(Pdfium::new).ok()?;
    let document = pdfium.load_pdf_from_byte_slice(bytes, None).ok()?;
    let page = document.pages().first().ok()?;
    let render_config = PdfRenderConfig::new().set_target_width(1600).set_maximum_height(2200);
    let bitmap = page.render_with_config(&render_config).ok()?;
    Some(bitmap.as_image().to_luma8())
}

#[cfg(not(all(feature = "qr", feature = "pdf")))]
fn rasterize_first_pdf_page(_bytes: &[u8]) -> Option<image::GrayImage> {
    None
}

#[cfg(feature = "qr")]
fn decode_qr_codes(gray_image: &image::GrayImage) -> Vec<QrCode> {
    let mut prepared = rqrr::PreparedImage::prepare(gray_image.clone());
    prepared
        .detect_grids()
        .iter()
        .filter_map(|grid| grid.decode().ok())
        .map(|(_meta, payload)| classify_payload(payload))
        .collect()
}

#[cfg(not(feature = "qr"))]
fn decode_qr_codes(_gray_image: &image::GrayImage) -> Vec<QrCode> {
    Vec::new()
}

fn classify_payload(payload: String) -> QrCode {
    if let Some(captures) = GAS_SAFE_RE.captures(&payload) {
        return QrCode {
            provider: QrProvider::GasSafe,
            url: Some(payload.clone()),
            verification_code: captures.get(1).map(|m| m.as_str().to_string()),
            raw_payload: payload,
        };
    }
    if let Some(captures) = GAS_TAG_RE.captures(&payload) {
        return QrCode {
            provider: QrProvider::GasTag,
            url: Some(payload.clone()),
            verification_code: captures.get(1).map(|m| m.as_str().to_string()),
            raw_payload: payload,
        };
    }
    if let Some(captures) = NICEIC_RE.captures(&payload) {
        return QrCode {
            provider: QrProvider::Niceic,
            url: Some(payload.clone()),
            verification_code: captures.get(1).map(|m| m.as_str().to_string()),
            raw_payload: payload,
        };
    }
    if let Some(captures) = CORGI_RE.captures(&payload) {
        return QrCode {
            provider: QrProvider::Corgi,
            url: Some(payload.clone()),
            verification_code: captures.get(1).map(|m| m.as_str().to_string()),
            raw_payload: payload,
        };
    }
    QrCode { provider: QrProvider::Other, url: None, verification_code: None, raw_payload: payload }
}

#[cfg(feature = "qr")]
fn extract_exif(bytes: &[u8]) -> Option<ExifData> {
    let mut cursor = std::io::Cursor::new(bytes);
    let reader = exif::Reader::new().read_from_container(&mut cursor).ok()?;

    let mut exif = ExifData::default();
    for field in reader.fields() {
        match field.tag {
            exif::Tag::DateTimeOriginal | exif::Tag::DateTime => {
                exif.date_taken = Some(field.display_value().to_string());
            }
            exif::Tag::Model => exif.device = Some(field.display_value().to_string()),
            exif::Tag::Software => exif.software = Some(field.display_value().to_string()),
            exif::Tag::GPSLatitude => {
                exif.gps_lat = parse_gps_component(&field.display_value().to_string());
            }
            exif::Tag::GPSLongitude => {
                exif.gps_lng = parse_gps_component(&field.display_value().to_string());
            }
            _ => {}
        }
    }
    Some(exif)
}

#[cfg(not(feature = "qr"))]
fn extract_exif(_bytes: &[u8]) -> Option<ExifData> {
    None
}

fn parse_gps_component(display: &str) -> Option<f64> {
    display.split_whitespace().next().and_then(|s| s.trim_end_matches("deg").parse::<f64>().ok())
}

/// `spec.md` §4.4: flattens recognised QR/EXIF data into the `fields` map and
/// sets `hasVerificationData`.
fn populate_fields(result: &mut QrMetadataResult) {
    for qr in &result.qr_codes {
        match qr.provider {
            QrProvider::GasSafe => {
                if let Some(code) = &qr.verification_code {
                    result.fields.insert("gasSafeId".to_string(), code.clone());
                }
            }
            QrProvider::GasTag => {
                if let Some(code) = &qr.verification_code {
                    result.fields.insert("gasTagRef".to_string(), code.clone());
                }
            }
            QrProvider::Niceic => {
                if let Some(code) = &qr.verification_code {
                    result.fields.insert("niceicRef".to_string(), code.clone());
                }
            }
            QrProvider::Corgi | QrProvider::Other => {}
        }
        if let Some(url) = &qr.url {
            result.fields.entry("verificationUrl".to_string()).or_insert_with(|| url.clone());
        }
    }

    if let Some(exif) = &result.exif {
        if let Some(date) = &exif.date_taken {
            result.fields.insert("photoDate".to_string(), normalize_exif_date(date));
        }
        if let Some(lat) = exif.gps_lat {
            result.fields.insert("latitude".to_string(), lat.to_string());
        }
        if let Some(lng) = exif.gps_lng {
            result.fields.insert("longitude".to_string(), lng.to_string());
        }
        if let Some(software) = &exif.software {
            result.fields.insert("generatingSoftware".to_string(), software.clone());
        }
    }

    let software_mentions_gas = result
        .exif
        .as_ref()
        .and_then(|e| e.software.as_ref())
        .is_some_and(|s| s.to_lowercase().contains("gas"));

    result.has_verification_data = result
        .qr_codes
        .iter()
        .any(|qr| qr.provider != QrProvider::Other)
        || software_mentions_gas;
}

fn normalize_exif_date(raw: &str) -> String {
    // EXIF timestamps are `YYYY:MM:DD HH:MM:SS`; keep just the ISO date part.
    let date_part = raw.split_whitespace().next().unwrap_or(raw);
    date_part.replacen(':', "-", 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_gas_safe_url() {
        let qr = classify_payload("https://gassaferegister.co.uk/check/AB12CD".to_string());
        assert_eq!(qr.provider, QrProvider::GasSafe);
        assert_eq!(qr.verification_code.as_deref(), Some("AB12CD"));
    }

    #[test]
    fn unrecognised_payload_is_other() {
        let qr = classify_payload("not a known provider".to_string());
        assert_eq!(qr.provider, QrProvider::Other);
        assert!(qr.verification_code.is_none());
    }

    #[test]
    fn populate_fields_sets_verification_flag_for_known_provider() {
        let mut result = QrMetadataResult {
            qr_codes: vec![classify_payload("https://gassaferegister.co.uk/check/AB12CD".to_string())],
            ..Default::default()
        };
        populate_fields(&mut result);
        assert!(result.has_verification_data);
        assert_eq!(result.field("gasSafeId"), Some("AB12CD"));
    }

    #[test]
    fn normalizes_exif_date_to_iso() {
        assert_eq!(normalize_exif_date("2024:07:03 10:15:00"), "2024-07-03");
    }
}
