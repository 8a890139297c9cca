//! The public extraction result, `spec.md` §3 "Extraction Result" and §6.

use super::audit::TierAuditEntry;
use super::format::{DocumentClassification, DocumentFormat};
use super::qr::{ExifData, QrCode};
use super::record::ExtractedRecord;
use super::tier::ExtractionTier;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub data: Option<ExtractedRecord>,
    pub final_tier: ExtractionTier,
    pub confidence: f64,
    pub total_processing_time_ms: u64,
    pub total_cost: f64,
    pub requires_review: bool,
    pub warnings: Vec<String>,
    pub raw_text: Option<String>,
    pub document_format: DocumentFormat,
    pub document_classification: DocumentClassification,
    pub page_count: u32,
    pub qr_codes: Vec<QrCode>,
    pub metadata: Option<ExifData>,
    pub tier_audit: Vec<TierAuditEntry>,
}

impl ExtractionResult {
    /// Sum of recorded `cost` across `tier_audit` — property 2 in `spec.md`
    /// §8 is that this always equals `total_cost`.
    pub fn audited_cost(&self) -> f64 {
        self.tier_audit.iter().map(|entry| entry.cost).sum()
    }
}
