//! certscan-core — tiered document-extraction engine for compliance
//! certificates (Gas Safety, EICR/EIC, FRA, PAT, and friends).
//!
//! The entry point is [`orchestrator::extract_certificate`], which walks a
//! document through the tier sequence described in `spec.md` §4: cheap,
//! deterministic tiers first (format sniffing, QR/EXIF harvest, regex
//! templates), escalating to paid AI providers only when confidence or
//! coverage falls short, and landing on manual review (Tier 4) as the
//! backstop.

pub mod audit_sink;
pub mod core;
pub mod cost_tracker;
pub mod decision;
pub mod error;
pub mod format_analyzer;
pub mod orchestrator;
pub mod providers;
pub mod qr_harvest;
pub mod settings;
pub mod template;
pub mod text_layer;
pub mod type_detector;
pub mod types;

pub use audit_sink::{AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use cost_tracker::CostTracker;
pub use decision::{decide, Decision};
pub use error::{CertScanError, CertScanErrorKind, Result};
pub use orchestrator::{extract_certificate, flush_audit, ExtractionOptions};
pub use providers::{
    Capability, DocumentIntelligenceProvider, OcrProvider, Provider, ProviderRegistry, TextExtractionProvider,
    VisionProvider,
};
pub use settings::{InMemorySettingsStore, Settings, SettingsLoader, SettingsStore};
pub use type_detector::{DetectionResult, DetectionSource, TypeDetector};
pub use types::{
    CertificateType, DocumentClassification, DocumentFormat, ExtractedRecord, ExtractionResult, ExtractionTier,
    FormatAnalysis, QrMetadataResult, TierAuditEntry, TierStatus,
};
