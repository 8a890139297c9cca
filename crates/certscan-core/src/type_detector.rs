//! C3 — Pattern-Based Type Detector.
//!
//! Loads active detection patterns from the settings store, sorted by
//! descending priority, and matches them against a document's filename and
//! text content (`spec.md` §4.3). Results are cached for 60s, the same
//! read-mostly-with-single-writer-refresh shape the teacher crate uses for
//! its processor cache (`core/pipeline/mod.rs`'s `PROCESSOR_CACHE`).

use crate::error::Result;
use crate::settings::{DetectionPatternRow, MatcherType, PatternField, SettingsStore};
use crate::types::CertificateType;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const CACHE_TTL: Duration = Duration::from_secs(60);

/// Built-in UK compliance markers used when no database pattern matches
/// (`spec.md` §4.2 "fall back to a built-in heuristic keyword table").
const FALLBACK_KEYWORDS: &[(&str, &str)] = &[
    ("LGSR", "GAS"),
    ("CP12", "GAS"),
    ("GAS SAFETY", "GAS"),
    ("EICR", "EICR"),
    ("BS 7671", "EICR"),
    ("ELECTRICAL INSTALLATION CONDITION REPORT", "EICR"),
    ("ENERGY PERFORMANCE CERTIFICATE", "EPC"),
    ("PAS 79", "FRA"),
    ("FIRE RISK ASSESSMENT", "FRA"),
    ("PORTABLE APPLIANCE TEST", "PAT"),
    ("LEGIONELLA", "LEGIONELLA"),
    ("ASBESTOS", "ASBESTOS"),
    ("LOLER", "LIFT"),
    ("EMERGENCY LIGHTING", "EMLT"),
    ("FIRE ALARM", "FIRE_ALARM"),
    ("SMOKE AND CO", "SMOKE_CO"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Database,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub cert_type: CertificateType,
    pub confidence: f64,
    pub source: DetectionSource,
}

struct CachedPatterns {
    patterns: Vec<DetectionPatternRow>,
    loaded_at: Instant,
}

static CACHE: Lazy<Mutex<Option<CachedPatterns>>> = Lazy::new(|| Mutex::new(None));

pub struct TypeDetector;

impl TypeDetector {
    /// Detects a certificate type from filename and optional text content.
    pub async fn detect(
        store: &dyn SettingsStore,
        filename: &str,
        text_content: Option<&str>,
    ) -> Result<DetectionResult> {
        let patterns = Self::patterns(store).await?;

        let mut best: Option<(&DetectionPatternRow, f64)> = None;
        for pattern in &patterns {
            let haystack = match pattern.pattern_type {
                PatternField::Filename => Some(filename),
                PatternField::TextContent => text_content,
            };
            let Some(haystack) = haystack else { continue };
            if matches(&pattern.matcher, &pattern.pattern, haystack) {
                let confidence = (f64::from(pattern.priority) / 100.0).min(1.0);
                if best.map(|(_, c)| confidence > c).unwrap_or(true) {
                    best = Some((pattern, confidence));
                }
            }
        }

        if let Some((pattern, confidence)) = best {
            debug!(cert_type = %pattern.cert_type, confidence, "type detected from database pattern");
            return Ok(DetectionResult {
                cert_type: pattern.cert_type.clone(),
                confidence,
                source: DetectionSource::Database,
            });
        }

        Ok(Self::fallback(filename, text_content))
    }

    fn fallback(filename: &str, text_content: Option<&str>) -> DetectionResult {
        let haystack = format!(
            "{} {}",
            filename.to_uppercase(),
            text_content.unwrap_or("").to_uppercase()
        );
        for (keyword, code) in FALLBACK_KEYWORDS {
            if haystack.contains(keyword) {
                return DetectionResult {
                    cert_type: CertificateType::from_code(code),
                    confidence: 0.5,
                    source: DetectionSource::Fallback,
                };
            }
        }
        DetectionResult {
            cert_type: CertificateType::Unknown,
            confidence: 0.0,
            source: DetectionSource::Fallback,
        }
    }

    async fn patterns(store: &dyn SettingsStore) -> Result<Vec<DetectionPatternRow>> {
        {
            let guard = CACHE.lock();
            if let Some(cached) = guard.as_ref()
                && cached.loaded_at.elapsed() < CACHE_TTL
            {
                return Ok(cached.patterns.clone());
            }
        }

        let mut patterns = store.detection_patterns().await?;
        patterns.sort_by(|a, b| b.priority.cmp(&a.priority));

        *CACHE.lock() = Some(CachedPatterns {
            patterns: patterns.clone(),
            loaded_at: Instant::now(),
        });

        Ok(patterns)
    }
}

fn matches(matcher: &MatcherType, pattern: &str, haystack: &str) -> bool {
    let haystack_lower = haystack.to_lowercase();
    let pattern_lower = pattern.to_lowercase();
    match matcher {
        MatcherType::Contains => haystack_lower.contains(&pattern_lower),
        MatcherType::StartsWith => haystack_lower.starts_with(&pattern_lower),
        MatcherType::EndsWith => haystack_lower.ends_with(&pattern_lower),
        MatcherType::Exact => haystack_lower == pattern_lower,
        MatcherType::Regex => match Regex::new(pattern) {
            Ok(re) => re.is_match(haystack),
            Err(err) => {
                warn!(pattern, error = %err, "invalid detection regex, skipping");
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::InMemorySettingsStore;
    use serial_test::serial;
    use std::collections::HashMap;

    // The pattern cache is a process-global (spec.md §4.3 "cached for 60s");
    // tests that populate it must run serially to avoid cross-test bleed.
    #[tokio::test]
    #[serial]
    async fn database_pattern_takes_priority_over_fallback() {
        let store = InMemorySettingsStore::new(HashMap::new()).with_patterns(vec![DetectionPatternRow {
            cert_type: CertificateType::Eicr,
            pattern_type: PatternField::Filename,
            matcher: MatcherType::Contains,
            pattern: "eicr".to_string(),
            priority: 90,
        }]);
        let result = TypeDetector::detect(&store, "EICR_report_2024.pdf", None).await.unwrap();
        assert_eq!(result.cert_type, CertificateType::Eicr);
        assert_eq!(result.source, DetectionSource::Database);
        assert!((result.confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    #[serial]
    async fn falls_back_to_builtin_keywords_on_no_match() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let result = TypeDetector::detect(&store, "scan1.pdf", Some("Landlord Gas Safety Record LGSR"))
            .await
            .unwrap();
        assert_eq!(result.cert_type, CertificateType::Gas);
        assert_eq!(result.source, DetectionSource::Fallback);
    }

    #[tokio::test]
    #[serial]
    async fn unknown_when_nothing_matches() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let result = TypeDetector::detect(&store, "random.pdf", None).await.unwrap();
        assert_eq!(result.cert_type, CertificateType::Unknown);
    }
}
