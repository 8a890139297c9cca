//! C9 — Decision Engine.
//!
//! A pure function: given the current tier's result (or error), the
//! settings, the cost tracker, and where we are in the tier sequence, decide
//! whether to complete, escalate, or abort (`spec.md` §4.9).

use crate::cost_tracker::CostTracker;
use crate::settings::Settings;
use crate::types::{CertificateType, ExtractionTier};

#[derive(Debug, Clone)]
pub enum Decision {
    Complete { reason: Option<String> },
    Escalate { next: ExtractionTier, reason: String },
    Abort { reason: String },
}

/// Outcome of the current tier, fed into [`decide`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentResult {
    pub confidence: f64,
}

pub fn decide(
    current_result: Option<CurrentResult>,
    error_occurred: bool,
    settings: &Settings,
    cost_tracker: &CostTracker,
    current_tier: ExtractionTier,
    cert_type: &CertificateType,
) -> Decision {
    if error_occurred {
        return match current_tier.next() {
            Some(next) => Decision::Escalate {
                next,
                reason: format!("error in {}", current_tier.label()),
            },
            None => Decision::Abort { reason: format!("error in {}, no further tiers", current_tier.label()) },
        };
    }

    let Some(current_result) = current_result else {
        return Decision::Abort { reason: "no result and no error reported".to_string() };
    };

    let tier_default = tier_default_threshold(current_tier, settings);
    let effective_threshold = settings.effective_threshold(tier_default, cert_type);

    if current_result.confidence >= effective_threshold {
        // `spec.md` §3 invariant I2 / §4.9 "post-call over-budget → Tier 4
        // with partial data": a call clearing its threshold still isn't a
        // clean `Complete` if paying for it pushed the document over its
        // cost ceiling — the run abandons remaining AI tiers and falls
        // through to manual review with what this tier produced.
        if cost_tracker.total_cost() > settings.max_cost_per_document {
            return Decision::Abort { reason: "cost limit exceeded".to_string() };
        }
        return Decision::Complete { reason: None };
    }

    let Some(next) = current_tier.next() else {
        return Decision::Complete { reason: Some("final tier reached".to_string()) };
    };

    let next_tier_cost = next.static_cost();
    if !cost_tracker.is_within_budget(next_tier_cost, settings.max_cost_per_document) {
        if settings.abort_on_cost_exceeded {
            return Decision::Abort { reason: "cost ceiling".to_string() };
        }
        return Decision::Complete { reason: Some("best-effort, cost limit".to_string()) };
    }

    Decision::Escalate {
        next,
        reason: format!(
            "confidence {:.2} below threshold {:.2}",
            current_result.confidence, effective_threshold
        ),
    }
}

fn tier_default_threshold(tier: ExtractionTier, settings: &Settings) -> f64 {
    match tier {
        ExtractionTier::Tier1 => settings.tier1_threshold,
        ExtractionTier::Tier1_5 => settings.tier1_5_threshold,
        ExtractionTier::Tier2 => settings.tier2_threshold,
        ExtractionTier::Tier3 => settings.tier3_threshold,
        other => other.default_threshold(),
    }
}
