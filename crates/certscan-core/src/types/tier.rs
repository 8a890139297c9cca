//! Extraction tier enumeration and its static cost/threshold tables.
//!
//! `spec.md` §3: total order `{0 < 0.5 < 1 < 1.5 < 2 < 3 < 4}`.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    /// Format analysis.
    Tier0,
    /// QR + EXIF harvest.
    Tier0_5,
    /// Regex template extraction.
    Tier1,
    /// LLM text extraction.
    Tier1_5,
    /// Document-intelligence extraction.
    Tier2,
    /// Vision extraction.
    Tier3,
    /// Manual review / best-effort assembly.
    Tier4,
}

impl ExtractionTier {
    /// All tiers in ascending order, matching the total order in `spec.md` §3.
    pub const ORDER: [ExtractionTier; 7] = [
        ExtractionTier::Tier0,
        ExtractionTier::Tier0_5,
        ExtractionTier::Tier1,
        ExtractionTier::Tier1_5,
        ExtractionTier::Tier2,
        ExtractionTier::Tier3,
        ExtractionTier::Tier4,
    ];

    /// The tier immediately after this one, or `None` if this is terminal.
    pub fn next(self) -> Option<ExtractionTier> {
        let idx = Self::ORDER.iter().position(|t| *t == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    /// A stable, display-friendly label used in audit rows and logs.
    pub fn label(self) -> &'static str {
        match self {
            ExtractionTier::Tier0 => "tier-0",
            ExtractionTier::Tier0_5 => "tier-0.5",
            ExtractionTier::Tier1 => "tier-1",
            ExtractionTier::Tier1_5 => "tier-1.5",
            ExtractionTier::Tier2 => "tier-2",
            ExtractionTier::Tier3 => "tier-3",
            ExtractionTier::Tier4 => "tier-4",
        }
    }

    /// The zero-indexed rank of this tier in the total order, used for the
    /// `tierOrder` audit field (`spec.md` §3 "Tier Audit Entry").
    pub fn tier_order(self) -> u8 {
        Self::ORDER.iter().position(|t| *t == self).unwrap_or(0) as u8
    }

    /// Static cost estimate in the document's currency unit, per `spec.md` §3.
    pub fn static_cost(self) -> f64 {
        match self {
            ExtractionTier::Tier0
            | ExtractionTier::Tier0_5
            | ExtractionTier::Tier1
            | ExtractionTier::Tier4 => 0.0,
            ExtractionTier::Tier1_5 => 0.003,
            ExtractionTier::Tier2 => 0.0015,
            ExtractionTier::Tier3 => 0.01,
        }
    }

    /// Tier 2's cost is per-page; this multiplies the static per-call cost by
    /// page count for tiers where that applies (only Tier 2 per `spec.md` §3).
    pub fn estimated_cost(self, page_count: u32) -> f64 {
        match self {
            ExtractionTier::Tier2 => self.static_cost() * f64::from(page_count.max(1)),
            _ => self.static_cost(),
        }
    }

    /// Default confidence threshold, per `spec.md` §3. Settings snapshots may
    /// override this on a per-document-type basis (§4.5, §4.9).
    pub fn default_threshold(self) -> f64 {
        match self {
            ExtractionTier::Tier0 => 1.0,
            ExtractionTier::Tier0_5 => 0.95,
            ExtractionTier::Tier1 => 0.85,
            ExtractionTier::Tier1_5 | ExtractionTier::Tier2 => 0.80,
            ExtractionTier::Tier3 => 0.70,
            ExtractionTier::Tier4 => 0.0,
        }
    }
}

impl fmt::Display for ExtractionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Outcome of a single tier attempt, per `spec.md` §3 "Tier Status".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Success,
    Escalated,
    Skipped,
    Failed,
    Pending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order_is_strictly_increasing() {
        let mut prev = None;
        for tier in ExtractionTier::ORDER {
            if let Some(p) = prev {
                assert!(p < tier);
            }
            prev = Some(tier);
        }
    }

    #[test]
    fn tier4_has_no_next() {
        assert_eq!(ExtractionTier::Tier4.next(), None);
    }

    #[test]
    fn tier2_cost_scales_with_pages() {
        assert!((ExtractionTier::Tier2.estimated_cost(10) - 0.015).abs() < 1e-9);
    }

    #[test]
    fn default_thresholds_match_spec() {
        assert_eq!(ExtractionTier::Tier0.default_threshold(), 1.0);
        assert_eq!(ExtractionTier::Tier1.default_threshold(), 0.85);
        assert_eq!(ExtractionTier::Tier3.default_threshold(), 0.70);
    }
}
