//! C10 — Orchestrator, the public entry point.
//!
//! Walks the tier sequence `{0 < 0.5 < 1 < 1.5 < 2 < 3 < 4}` per `spec.md`
//! §4.10, consulting [`crate::decision::decide`] after every tier attempt.
//! Mirrors the shape of the teacher crate's `run_pipeline` (`core/pipeline/
//! mod.rs`): one async function, a config/options struct threaded through,
//! and a sequence of `execute_*` steps each recorded as it goes.

use crate::audit_sink::{self, AuditSink};
use crate::cost_tracker::CostTracker;
use crate::decision::{decide, CurrentResult, Decision};
use crate::error::Result;
use crate::format_analyzer;
use crate::providers::{ExtractionContext, ProviderRegistry};
use crate::qr_harvest;
use crate::settings::{Settings, SettingsStore};
use crate::template;
use crate::types::{
    CertificateType, DocumentClassification, DocumentFormat, ExtractedRecord, ExtractionResult,
    ExtractionTier, TierAuditBuilder, TierStatus,
};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Per-call overrides, the defaulted-builder idiom the teacher crate uses
/// for `ExtractionConfig` (`crates/kreuzberg-php/src/config.rs`).
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    pub force_ai: bool,
    pub skip_tiers: Vec<ExtractionTier>,
    pub preferred_tier: Option<ExtractionTier>,
    pub max_cost: Option<f64>,
    pub timeout: Option<std::time::Duration>,
}

impl ExtractionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_ai(mut self, force_ai: bool) -> Self {
        self.force_ai = force_ai;
        self
    }

    pub fn skip_tiers(mut self, tiers: Vec<ExtractionTier>) -> Self {
        self.skip_tiers = tiers;
        self
    }

    pub fn preferred_tier(mut self, tier: ExtractionTier) -> Self {
        self.preferred_tier = Some(tier);
        self
    }

    pub fn max_cost(mut self, max_cost: f64) -> Self {
        self.max_cost = Some(max_cost);
        self
    }

    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn is_skipped(&self, tier: ExtractionTier) -> bool {
        self.skip_tiers.contains(&tier)
    }
}

struct RunState<'a> {
    certificate_id: &'a str,
    cert_type: CertificateType,
    settings: Settings,
    cost_tracker: CostTracker,
    audit: Vec<crate::types::TierAuditEntry>,
    warnings: Vec<String>,
    best: Option<(ExtractionTier, ExtractedRecord, f64)>,
    /// Set once the decision engine returns `Abort` (`spec.md` §4.9) — the
    /// run still lands on Tier 4, but skips any remaining paid tiers.
    aborted: bool,
}

impl<'a> RunState<'a> {
    fn record_best(&mut self, tier: ExtractionTier, data: ExtractedRecord, confidence: f64) {
        let should_replace = match &self.best {
            Some((_, _, best_conf)) => confidence > *best_conf,
            None => true,
        };
        if should_replace {
            self.best = Some((tier, data, confidence));
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

/// Runs the full tiered extraction over `bytes`, per `spec.md` §4.10.
///
/// `registry` may be a freshly constructed, empty [`ProviderRegistry`] — the
/// `¬aiEnabled` and "no configured provider" paths degrade gracefully to
/// template-only / manual-review results rather than erroring.
#[allow(clippy::too_many_arguments)]
pub async fn extract_certificate(
    certificate_id: &str,
    bytes: &[u8],
    filename: &str,
    declared_mime: Option<&str>,
    store: &dyn SettingsStore,
    registry: &ProviderRegistry,
    sink: &dyn AuditSink,
    options: ExtractionOptions,
) -> Result<ExtractionResult> {
    let run_started = Instant::now();
    let mut settings = crate::settings::SettingsLoader::load(store).await?;
    if options.force_ai {
        settings.ai_enabled = true;
    }
    if let Some(max_cost) = options.max_cost {
        settings.max_cost_per_document = max_cost;
    }

    let mut state = RunState {
        certificate_id,
        cert_type: CertificateType::Unknown,
        settings,
        cost_tracker: CostTracker::new(),
        audit: Vec::new(),
        warnings: Vec::new(),
        best: None,
        aborted: false,
    };

    // Tier 0 — Format Analysis, spec.md §4.2. Always succeeds.
    let tier0_started = now_ms();
    let analysis = format_analyzer::analyze(store, bytes, filename, declared_mime).await?;
    state.cert_type = analysis.detected_certificate_type.clone();
    let cert_type_for_audit = state.cert_type.clone();
    push_audit(
        &mut state,
        ExtractionTier::Tier0,
        tier0_started,
        TierStatus::Success,
        1.0,
        0.0,
        0,
        |b| {
            b.document_format(analysis.format)
                .document_classification(analysis.classification)
                .page_count(analysis.page_count)
                .text_quality(analysis.text_quality)
                .certificate_type(cert_type_for_audit)
        },
    );

    // Tier 0.5 — QR + EXIF harvest, spec.md §4.4. Short-circuits on verified data.
    let tier0_5_started = now_ms();
    let qr_result = qr_harvest::harvest(analysis.format, bytes);
    push_audit(
        &mut state,
        ExtractionTier::Tier0_5,
        tier0_5_started,
        if qr_result.has_verification_data { TierStatus::Success } else { TierStatus::Escalated },
        if qr_result.has_verification_data { 0.95 } else { 0.0 },
        0.0,
        qr_result.fields.len(),
        |b| {
            let b = b.qr_codes_found(qr_result.qr_codes.len()).metadata_extracted(qr_result.exif.is_some());
            if qr_result.has_verification_data {
                b
            } else {
                b.escalation_reason("no QR/verification data")
            }
        },
    );

    if qr_result.has_verification_data && !options.is_skipped(ExtractionTier::Tier0_5) {
        let data = record_from_qr_fields(&qr_result);
        info!(certificate_id, "qr verification data present, short-circuiting at tier 0.5");
        return Ok(finish(
            state,
            run_started,
            true,
            Some(data),
            ExtractionTier::Tier0_5,
            0.95,
            false,
            analysis.text_content.clone(),
            analysis.format,
            analysis.classification,
            analysis.page_count,
            qr_result.qr_codes,
            qr_result.exif,
        ));
    }

    // `¬aiEnabled` and no text layer at all: nothing left to try but manual review.
    if !state.settings.ai_enabled && !analysis.has_text_layer {
        state.warnings.push("no text layer and AI tiers disabled: landing on manual review with no extracted data".to_string());
        for tier in [ExtractionTier::Tier1_5, ExtractionTier::Tier2, ExtractionTier::Tier3] {
            push_audit(&mut state, tier, now_ms(), TierStatus::Skipped, 0.0, 0.0, 0, |b| {
                b.escalation_reason("AI disabled")
            });
        }
        let started = now_ms();
        push_audit(
            &mut state,
            ExtractionTier::Tier4,
            started,
            TierStatus::Success,
            0.0,
            0.0,
            0,
            |b| b,
        );
        return Ok(finish(
            state,
            run_started,
            true,
            None,
            ExtractionTier::Tier4,
            0.0,
            true,
            analysis.text_content.clone(),
            analysis.format,
            analysis.classification,
            analysis.page_count,
            qr_result.qr_codes,
            qr_result.exif,
        ));
    }

    // Tier 1 — Template Extraction, spec.md §4.5.
    let mut tier1_outcome: Option<(ExtractedRecord, f64)> = None;
    if let Some(text) = analysis.text_content.as_deref() {
        if !options.is_skipped(ExtractionTier::Tier1) {
            let started = now_ms();
            let custom = state.settings.custom_patterns.get(&state.cert_type.code());
            let result = template::extract(&state.cert_type, text, custom);
            state.record_best(ExtractionTier::Tier1, result.data.clone(), result.confidence);
            tier1_outcome = Some((result.data.clone(), result.confidence));

            let decision = decide(
                Some(CurrentResult { confidence: result.confidence }),
                false,
                &state.settings,
                &state.cost_tracker,
                ExtractionTier::Tier1,
                &state.cert_type,
            );
            // `spec.md` §3 invariant I4: a tier is only `Success` when
            // confidence clears its effective threshold, not merely when the
            // extractor itself reports a match.
            let escalation_reason = match &decision {
                Decision::Escalate { reason, .. } | Decision::Abort { reason } => Some(reason.clone()),
                Decision::Complete { .. } => None,
            };
            push_audit(
                &mut state,
                ExtractionTier::Tier1,
                started,
                if matches!(decision, Decision::Complete { .. }) { TierStatus::Success } else { TierStatus::Escalated },
                result.confidence,
                0.0,
                result.data.populated_field_count(),
                |b| match escalation_reason {
                    Some(reason) => b.escalation_reason(reason),
                    None => b,
                },
            );
            match decision {
                Decision::Complete { .. } => {
                    let (data, confidence) = tier1_outcome.expect("just assigned");
                    return Ok(finish(
                        state,
                        run_started,
                        true,
                        Some(data),
                        ExtractionTier::Tier1,
                        confidence,
                        false,
                        analysis.text_content.clone(),
                        analysis.format,
                        analysis.classification,
                        analysis.page_count,
                        qr_result.qr_codes,
                        qr_result.exif,
                    ));
                }
                Decision::Abort { reason } => {
                    state.aborted = true;
                    state.warnings.push(format!("aborting remaining ai tiers: {reason}"));
                }
                Decision::Escalate { .. } => {}
            }
        }
    }

    // `¬aiEnabled`: Tiers 1.5/2/3 are skipped outright; land on Tier 4 with
    // whatever Tier 1 produced, flagged for manual review.
    if !state.settings.ai_enabled {
        state.warnings.push("AI tiers disabled: escalation stops at tier 1, manual review required".to_string());
        for tier in [ExtractionTier::Tier1_5, ExtractionTier::Tier2, ExtractionTier::Tier3] {
            let started = now_ms();
            push_audit(&mut state, tier, started, TierStatus::Skipped, 0.0, 0.0, 0, |b| {
                b.escalation_reason("AI disabled")
            });
        }
        let started = now_ms();
        let (best_tier, best_data, best_conf) =
            state.best.clone().unwrap_or((ExtractionTier::Tier4, ExtractedRecord::default(), 0.0));
        push_audit(
            &mut state,
            ExtractionTier::Tier4,
            started,
            TierStatus::Success,
            best_conf,
            0.0,
            best_data.populated_field_count(),
            |b| b.escalation_reason(format!("AI disabled, best effort from {}", best_tier.label())),
        );
        return Ok(finish(
            state,
            run_started,
            true,
            Some(best_data),
            ExtractionTier::Tier4,
            best_conf,
            true,
            analysis.text_content.clone(),
            analysis.format,
            analysis.classification,
            analysis.page_count,
            qr_result.qr_codes,
            qr_result.exif,
        ));
    }

    let schema = extraction_schema();
    let context = ExtractionContext { certificate_type: state.cert_type.clone(), filename: filename.to_string() };

    // Tier 1.5 — LLM text extraction, spec.md §4.6.
    if !state.aborted
        && !options.is_skipped(ExtractionTier::Tier1_5)
        && analysis.has_text_layer
        && registry.has_text_extraction_provider()
    {
        let started = now_ms();
        let text = analysis.text_content.as_deref().unwrap_or_default();
        match registry.call_text_extraction(text, &schema, &context).await {
            Ok(call) => {
                state.cost_tracker.record_cost(call.cost, &call.provider);
                let data = record_from_provider_json(call.data.as_ref());
                state.record_best(ExtractionTier::Tier1_5, data.clone(), call.confidence);

                let decision = decide(
                    Some(CurrentResult { confidence: call.confidence }),
                    false,
                    &state.settings,
                    &state.cost_tracker,
                    ExtractionTier::Tier1_5,
                    &state.cert_type,
                );
                let escalation_reason = match &decision {
                    Decision::Escalate { reason, .. } | Decision::Abort { reason } => Some(reason.clone()),
                    Decision::Complete { .. } => None,
                };
                push_audit(
                    &mut state,
                    ExtractionTier::Tier1_5,
                    started,
                    if call.success && matches!(decision, Decision::Complete { .. }) {
                        TierStatus::Success
                    } else {
                        TierStatus::Escalated
                    },
                    call.confidence,
                    call.cost,
                    data.populated_field_count(),
                    |b| match escalation_reason {
                        Some(reason) => b.escalation_reason(reason),
                        None => b,
                    },
                );
                match decision {
                    Decision::Complete { .. } => {
                        return Ok(finish(
                            state,
                            run_started,
                            true,
                            Some(data),
                            ExtractionTier::Tier1_5,
                            call.confidence,
                            false,
                            analysis.text_content.clone(),
                            analysis.format,
                            analysis.classification,
                            analysis.page_count,
                            qr_result.qr_codes,
                            qr_result.exif,
                        ));
                    }
                    Decision::Abort { reason } => {
                        state.aborted = true;
                        state.warnings.push(format!("aborting remaining ai tiers: {reason}"));
                    }
                    Decision::Escalate { .. } => {}
                }
            }
            Err(err) => {
                debug!(error = %err, "tier 1.5 failed, escalating");
                push_audit(&mut state, ExtractionTier::Tier1_5, started, TierStatus::Failed, 0.0, 0.0, 0, |b| {
                    b.escalation_reason(err.to_string())
                });
            }
        }
    }

    // Tier 2 — Document Intelligence, spec.md §4.6. Budget-gated per page count.
    if !state.aborted && !options.is_skipped(ExtractionTier::Tier2) && registry.has_document_intelligence_or_ocr_provider() {
        let estimated = ExtractionTier::Tier2.estimated_cost(analysis.page_count);
        if state.cost_tracker.is_within_budget(estimated, state.settings.max_cost_per_document) {
            let started = now_ms();
            match registry.call_document_intelligence(bytes, mime_for(analysis.format)).await {
                Ok(call) => {
                    state.cost_tracker.record_cost(call.cost, &call.provider);
                    let data = record_from_di_result(call.text.as_deref(), call.structured_data.as_ref());
                    state.record_best(ExtractionTier::Tier2, data.clone(), call.confidence);

                    let decision = decide(
                        Some(CurrentResult { confidence: call.confidence }),
                        false,
                        &state.settings,
                        &state.cost_tracker,
                        ExtractionTier::Tier2,
                        &state.cert_type,
                    );
                    let escalation_reason = match &decision {
                        Decision::Escalate { reason, .. } | Decision::Abort { reason } => Some(reason.clone()),
                        Decision::Complete { .. } => None,
                    };
                    push_audit(
                        &mut state,
                        ExtractionTier::Tier2,
                        started,
                        if call.success && matches!(decision, Decision::Complete { .. }) {
                            TierStatus::Success
                        } else {
                            TierStatus::Escalated
                        },
                        call.confidence,
                        call.cost,
                        data.populated_field_count(),
                        |b| {
                            let b = b.page_count(call.page_count);
                            match escalation_reason {
                                Some(reason) => b.escalation_reason(reason),
                                None => b,
                            }
                        },
                    );
                    match decision {
                        Decision::Complete { .. } => {
                            return Ok(finish(
                                state,
                                run_started,
                                true,
                                Some(data),
                                ExtractionTier::Tier2,
                                call.confidence,
                                false,
                                analysis.text_content.clone(),
                                analysis.format,
                                analysis.classification,
                                analysis.page_count,
                                qr_result.qr_codes,
                                qr_result.exif,
                            ));
                        }
                        Decision::Abort { reason } => {
                            state.aborted = true;
                            state.warnings.push(format!("aborting remaining ai tiers: {reason}"));
                        }
                        Decision::Escalate { .. } => {}
                    }
                }
                Err(err) => {
                    debug!(error = %err, "tier 2 failed, escalating");
                    push_audit(&mut state, ExtractionTier::Tier2, started, TierStatus::Failed, 0.0, 0.0, 0, |b| {
                        b.escalation_reason(err.to_string())
                    });
                }
            }
        } else {
            push_audit(&mut state, ExtractionTier::Tier2, now_ms(), TierStatus::Skipped, 0.0, 0.0, 0, |b| {
                b.escalation_reason("over budget")
            });
        }
    }

    // Tier 3 — Vision, spec.md §4.6. Budget-gated, image vs PDF call split.
    if !state.aborted && !options.is_skipped(ExtractionTier::Tier3) && registry.has_vision_provider() {
        let estimated = ExtractionTier::Tier3.static_cost();
        if state.cost_tracker.is_within_budget(estimated, state.settings.max_cost_per_document) {
            let started = now_ms();
            let call_result = if analysis.format == DocumentFormat::Image {
                registry.call_vision_image(bytes, mime_for(analysis.format), &schema, &context).await
            } else if analysis.format.is_pdf() {
                registry.call_vision_pdf(bytes, &schema, &context).await
            } else {
                Err(crate::error::CertScanError::UnsupportedFormat(
                    "vision tier only supports image and pdf containers".to_string(),
                ))
            };

            match call_result {
                Ok(call) => {
                    state.cost_tracker.record_cost(call.cost, &call.provider);
                    let data = record_from_provider_json(call.data.as_ref());
                    state.record_best(ExtractionTier::Tier3, data.clone(), call.confidence);

                    let decision = decide(
                        Some(CurrentResult { confidence: call.confidence }),
                        false,
                        &state.settings,
                        &state.cost_tracker,
                        ExtractionTier::Tier3,
                        &state.cert_type,
                    );
                    let escalation_reason = match &decision {
                        Decision::Escalate { reason, .. } | Decision::Abort { reason } => Some(reason.clone()),
                        Decision::Complete { .. } => None,
                    };
                    push_audit(
                        &mut state,
                        ExtractionTier::Tier3,
                        started,
                        if call.success && matches!(decision, Decision::Complete { .. }) {
                            TierStatus::Success
                        } else {
                            TierStatus::Escalated
                        },
                        call.confidence,
                        call.cost,
                        data.populated_field_count(),
                        |b| match escalation_reason {
                            Some(reason) => b.escalation_reason(reason),
                            None => b,
                        },
                    );
                    match decision {
                        Decision::Complete { .. } => {
                            return Ok(finish(
                                state,
                                run_started,
                                true,
                                Some(data),
                                ExtractionTier::Tier3,
                                call.confidence,
                                false,
                                analysis.text_content.clone(),
                                analysis.format,
                                analysis.classification,
                                analysis.page_count,
                                qr_result.qr_codes,
                                qr_result.exif,
                            ));
                        }
                        Decision::Abort { reason } => {
                            state.aborted = true;
                            state.warnings.push(format!("aborting remaining ai tiers: {reason}"));
                        }
                        Decision::Escalate { .. } => {}
                    }
                }
                Err(err) => {
                    debug!(error = %err, "tier 3 failed, falling through to manual review");
                    push_audit(&mut state, ExtractionTier::Tier3, started, TierStatus::Failed, 0.0, 0.0, 0, |b| {
                        b.escalation_reason(err.to_string())
                    });
                }
            }
        } else {
            push_audit(&mut state, ExtractionTier::Tier3, now_ms(), TierStatus::Skipped, 0.0, 0.0, 0, |b| {
                b.escalation_reason("over budget")
            });
        }
    }

    // Tier 4 — manual review, spec.md §4.9/§4.10: best-confidence partial
    // data from any tier ≥ Tier 1, flagged for human follow-up.
    let started = now_ms();
    let (best_tier, best_data, best_conf) =
        state.best.clone().unwrap_or((ExtractionTier::Tier4, ExtractedRecord::default(), 0.0));
    state.warnings.push(format!(
        "all paid tiers exhausted or aborted: landing on tier 4 manual review with best confidence {:.2} from {}",
        best_conf,
        best_tier.label()
    ));
    push_audit(
        &mut state,
        ExtractionTier::Tier4,
        started,
        TierStatus::Success,
        best_conf,
        0.0,
        best_data.populated_field_count(),
        |b| b.escalation_reason(format!("all ai tiers exhausted, best effort from {}", best_tier.label())),
    );

    Ok(finish(
        state,
        run_started,
        true,
        Some(best_data),
        ExtractionTier::Tier4,
        best_conf,
        true,
        analysis.text_content.clone(),
        analysis.format,
        analysis.classification,
        analysis.page_count,
        qr_result.qr_codes,
        qr_result.exif,
    ))
}

fn push_audit(
    state: &mut RunState<'_>,
    tier: ExtractionTier,
    attempted_at_ms: u64,
    status: TierStatus,
    confidence: f64,
    cost: f64,
    field_count: usize,
    customize: impl FnOnce(TierAuditBuilder) -> TierAuditBuilder,
) {
    let builder = TierAuditBuilder::new(state.certificate_id, tier, attempted_at_ms)
        .status(status)
        .confidence(confidence)
        .cost(cost)
        .extracted_field_count(field_count)
        .completed_at_ms(now_ms());
    let entry = customize(builder).build();
    state.audit.push(entry);
}

#[allow(clippy::too_many_arguments)]
fn finish(
    state: RunState<'_>,
    run_started: Instant,
    success: bool,
    data: Option<ExtractedRecord>,
    final_tier: ExtractionTier,
    confidence: f64,
    requires_review: bool,
    raw_text: Option<String>,
    document_format: DocumentFormat,
    document_classification: DocumentClassification,
    page_count: u32,
    qr_codes: Vec<crate::types::QrCode>,
    metadata: Option<crate::types::ExifData>,
) -> ExtractionResult {
    let total_cost = state.cost_tracker.total_cost();
    ExtractionResult {
        success,
        data,
        final_tier,
        confidence,
        total_processing_time_ms: run_started.elapsed().as_millis() as u64,
        total_cost,
        requires_review,
        warnings: state.warnings,
        raw_text,
        document_format,
        document_classification,
        page_count,
        qr_codes,
        metadata,
        tier_audit: state.audit,
    }
}

/// Fires audit writes for every row accumulated during this run, best-effort
/// (`spec.md` §3 "Audit sink": failures never affect the extraction result).
pub async fn flush_audit(sink: &dyn AuditSink, result: &ExtractionResult) {
    for entry in &result.tier_audit {
        audit_sink::record(sink, entry).await;
    }
}

/// `spec.md` §4.4: Tier 0.5 short-circuit builds a minimal record straight
/// from the verification fields, no text parsing involved.
fn record_from_qr_fields(qr: &crate::types::QrMetadataResult) -> ExtractedRecord {
    let certificate_number = qr
        .qr_codes
        .iter()
        .find_map(|code| code.verification_code.clone());
    ExtractedRecord {
        certificate_number,
        inspection_date: qr.field("photoDate").map(str::to_string),
        engineer_registration: qr.field("gasSafeId").map(str::to_string),
        ..Default::default()
    }
}

fn record_from_provider_json(data: Option<&serde_json::Value>) -> ExtractedRecord {
    match data {
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_default(),
        None => ExtractedRecord::default(),
    }
}

fn record_from_di_result(text: Option<&str>, structured: Option<&serde_json::Value>) -> ExtractedRecord {
    if let Some(structured) = structured {
        return record_from_provider_json(Some(structured));
    }
    match text {
        Some(text) => {
            let result = template::extract(&CertificateType::Unknown, text, None);
            result.data
        }
        None => ExtractedRecord::default(),
    }
}

fn mime_for(format: DocumentFormat) -> &'static str {
    match format {
        DocumentFormat::PdfNative | DocumentFormat::PdfScanned | DocumentFormat::PdfHybrid => "application/pdf",
        DocumentFormat::Image => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Minimal JSON schema shared across provider calls; providers map their
/// structured output back onto [`ExtractedRecord`]'s field names.
fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "certificateNumber": {"type": "string"},
            "propertyAddress": {"type": "string"},
            "inspectionDate": {"type": "string"},
            "expiryDate": {"type": "string"},
            "outcome": {"type": "string"},
            "engineerName": {"type": "string"},
            "engineerRegistration": {"type": "string"},
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit_sink::InMemoryAuditSink;
    use crate::settings::InMemorySettingsStore;
    use std::collections::HashMap;

    #[tokio::test]
    async fn ai_disabled_with_text_layer_lands_on_tier4_with_template_data() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let registry = ProviderRegistry::new();
        let sink = InMemoryAuditSink::new();
        let bytes = b"Certificate No: LGSR-99999\nGas Safe Reg: 7654321\nInspection Date: 01/01/2024\nOverall: Satisfactory\n";

        let result = extract_certificate(
            "cert-1",
            bytes,
            "cert.txt",
            None,
            &store,
            &registry,
            &sink,
            ExtractionOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.final_tier, ExtractionTier::Tier4);
        assert!(result.requires_review);
        assert!(result.data.unwrap().certificate_number.is_some());
    }

    #[tokio::test]
    async fn ai_disabled_without_text_layer_skips_straight_to_manual_review() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let registry = ProviderRegistry::new();
        let sink = InMemoryAuditSink::new();

        let result = extract_certificate(
            "cert-2",
            b"\xff\xd8\xff\xe0",
            "scan.jpg",
            Some("image/jpeg"),
            &store,
            &registry,
            &sink,
            ExtractionOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.final_tier, ExtractionTier::Tier4);
        assert!(result.data.is_none());
        assert!(result.requires_review);
    }

    #[tokio::test]
    async fn audited_cost_is_non_negative_and_tracks_total() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let registry = ProviderRegistry::new();
        let sink = InMemoryAuditSink::new();
        let bytes = b"no markers here at all";

        let result = extract_certificate(
            "cert-3",
            bytes,
            "cert.txt",
            None,
            &store,
            &registry,
            &sink,
            ExtractionOptions::new(),
        )
        .await
        .unwrap();

        assert!(result.total_cost >= 0.0);
        flush_audit(&sink, &result).await;
        assert_eq!(sink.entries().len(), result.tier_audit.len());
    }
}
