//! Per-tier audit entry — the provenance trail for one extraction.
//! `spec.md` §3 "Tier Audit Entry": immutable, one row per tier attempt.

use super::certificate::CertificateType;
use super::format::{DocumentClassification, DocumentFormat};
use super::tier::{ExtractionTier, TierStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierAuditEntry {
    pub certificate_id: String,
    pub extraction_run_id: Option<String>,
    pub tier: ExtractionTier,
    pub tier_order: u8,
    pub attempted_at_ms: u64,
    pub completed_at_ms: u64,
    pub processing_time_ms: u64,
    pub status: TierStatus,
    pub confidence: f64,
    pub cost: f64,
    pub extracted_field_count: usize,
    pub escalation_reason: Option<String>,
    pub document_format: Option<DocumentFormat>,
    pub document_classification: Option<DocumentClassification>,
    pub page_count: Option<u32>,
    pub text_quality: Option<f64>,
    pub qr_codes_found: Option<usize>,
    pub metadata_extracted: Option<bool>,
    pub raw_output: Option<String>,
    pub certificate_type: Option<CertificateType>,
}

/// Builder used by the orchestrator, since most callers only populate a
/// handful of the fields above for a given tier attempt.
pub struct TierAuditBuilder {
    entry: TierAuditEntry,
}

impl TierAuditBuilder {
    pub fn new(certificate_id: impl Into<String>, tier: ExtractionTier, attempted_at_ms: u64) -> Self {
        Self {
            entry: TierAuditEntry {
                certificate_id: certificate_id.into(),
                extraction_run_id: None,
                tier,
                tier_order: tier.tier_order(),
                attempted_at_ms,
                completed_at_ms: attempted_at_ms,
                processing_time_ms: 0,
                status: TierStatus::Pending,
                confidence: 0.0,
                cost: 0.0,
                extracted_field_count: 0,
                escalation_reason: None,
                document_format: None,
                document_classification: None,
                page_count: None,
                text_quality: None,
                qr_codes_found: None,
                metadata_extracted: None,
                raw_output: None,
                certificate_type: None,
            },
        }
    }

    pub fn status(mut self, status: TierStatus) -> Self {
        self.entry.status = status;
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.entry.confidence = confidence;
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.entry.cost = cost;
        self
    }

    pub fn extracted_field_count(mut self, count: usize) -> Self {
        self.entry.extracted_field_count = count;
        self
    }

    pub fn escalation_reason(mut self, reason: impl Into<String>) -> Self {
        self.entry.escalation_reason = Some(reason.into());
        self
    }

    pub fn document_format(mut self, format: DocumentFormat) -> Self {
        self.entry.document_format = Some(format);
        self
    }

    pub fn document_classification(mut self, classification: DocumentClassification) -> Self {
        self.entry.document_classification = Some(classification);
        self
    }

    pub fn page_count(mut self, count: u32) -> Self {
        self.entry.page_count = Some(count);
        self
    }

    pub fn text_quality(mut self, quality: f64) -> Self {
        self.entry.text_quality = Some(quality);
        self
    }

    pub fn qr_codes_found(mut self, count: usize) -> Self {
        self.entry.qr_codes_found = Some(count);
        self
    }

    pub fn metadata_extracted(mut self, found: bool) -> Self {
        self.entry.metadata_extracted = Some(found);
        self
    }

    pub fn certificate_type(mut self, cert_type: CertificateType) -> Self {
        self.entry.certificate_type = Some(cert_type);
        self
    }

    pub fn completed_at_ms(mut self, completed_at_ms: u64) -> Self {
        self.entry.processing_time_ms = completed_at_ms.saturating_sub(self.entry.attempted_at_ms);
        self.entry.completed_at_ms = completed_at_ms;
        self
    }

    pub fn build(self) -> TierAuditEntry {
        self.entry
    }
}
