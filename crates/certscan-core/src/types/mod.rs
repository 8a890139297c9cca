//! Core data types for certificate extraction.

pub mod audit;
pub mod certificate;
pub mod format;
pub mod qr;
pub mod record;
pub mod result;
pub mod tier;

pub use audit::{TierAuditBuilder, TierAuditEntry};
pub use certificate::CertificateType;
pub use format::{DocumentClassification, DocumentFormat, FormatAnalysis};
pub use qr::{ExifData, QrCode, QrMetadataResult, QrProvider};
pub use record::{Appliance, Defect, DefectSeverity, ExtractedRecord, Outcome};
pub use result::ExtractionResult;
pub use tier::{ExtractionTier, TierStatus};
