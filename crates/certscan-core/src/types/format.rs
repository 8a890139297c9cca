//! Document container format and classification, plus the Tier 0 output
//! shape (`spec.md` §3 "Document Format", "Document Classification",
//! "Format Analysis").

use super::certificate::CertificateType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    PdfNative,
    PdfScanned,
    PdfHybrid,
    Docx,
    Xlsx,
    Csv,
    Html,
    PlainText,
    Email,
    Image,
}

impl DocumentFormat {
    pub fn is_pdf(self) -> bool {
        matches!(self, Self::PdfNative | Self::PdfScanned | Self::PdfHybrid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DocumentClassification {
    StructuredCertificate,
    ComplexDocument,
    HandwrittenContent,
    Spreadsheet,
    Unknown,
}

impl DocumentClassification {
    /// `spec.md` §4.2: classification is derived from the detected
    /// certificate type.
    pub fn from_certificate_type(cert_type: &CertificateType) -> Self {
        use CertificateType::*;
        match cert_type {
            Gas | Eicr | Epc | Pat | Emlt | FireAlarm | SmokeCo => Self::StructuredCertificate,
            Fra | Asbestos | Legionella => Self::ComplexDocument,
            Lift | Bsc | Other(_) | Unknown => Self::Unknown,
        }
    }
}

/// Output of Tier 0 (`spec.md` §3 "Format Analysis").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatAnalysis {
    pub format: DocumentFormat,
    pub classification: DocumentClassification,
    pub detected_certificate_type: CertificateType,
    pub has_text_layer: bool,
    pub is_scanned: bool,
    pub is_hybrid: bool,
    pub text_content: Option<String>,
    pub page_count: u32,
    pub text_quality: f64,
    pub avg_chars_per_page: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_maps_structured_types() {
        assert_eq!(
            DocumentClassification::from_certificate_type(&CertificateType::Gas),
            DocumentClassification::StructuredCertificate
        );
        assert_eq!(
            DocumentClassification::from_certificate_type(&CertificateType::Fra),
            DocumentClassification::ComplexDocument
        );
        assert_eq!(
            DocumentClassification::from_certificate_type(&CertificateType::Lift),
            DocumentClassification::Unknown
        );
        assert_eq!(
            DocumentClassification::from_certificate_type(&CertificateType::Unknown),
            DocumentClassification::Unknown
        );
    }
}
