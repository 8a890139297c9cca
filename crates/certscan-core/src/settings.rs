//! C1 — Settings Loader.
//!
//! Materialises an immutable `Settings` snapshot from the external
//! key/value settings store (`spec.md` §4.1, §6). The store itself is an
//! external collaborator: callers implement `SettingsStore` against
//! whatever backs their key/value table (database, env, feature-flag
//! service); this crate only defines the contract and the coercion rules.

use crate::error::Result;
use crate::types::CertificateType;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

/// External key/value settings store, `spec.md` §6.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch a single raw string value for a key, or `None` if unset.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Fetch the active, priority-ordered detection patterns (C3). Default
    /// implementation returns an empty list, so a store that doesn't back a
    /// pattern table still satisfies the trait.
    async fn detection_patterns(&self) -> Result<Vec<DetectionPatternRow>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone)]
pub enum MatcherType {
    Contains,
    StartsWith,
    EndsWith,
    Exact,
    Regex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    Filename,
    TextContent,
}

#[derive(Debug, Clone)]
pub struct DetectionPatternRow {
    pub cert_type: CertificateType,
    pub pattern_type: PatternField,
    pub matcher: MatcherType,
    pub pattern: String,
    pub priority: i32,
}

/// Immutable configuration snapshot for one extraction call, `spec.md` §3
/// "Settings snapshot".
#[derive(Debug, Clone)]
pub struct Settings {
    pub ai_enabled: bool,
    pub tier1_threshold: f64,
    pub tier1_5_threshold: f64,
    pub tier2_threshold: f64,
    pub tier3_threshold: f64,
    pub max_cost_per_document: f64,
    pub abort_on_cost_exceeded: bool,
    pub document_type_thresholds: HashMap<String, f64>,
    pub custom_patterns: HashMap<String, HashMap<String, Vec<String>>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Fail-closed on cost: a missing key resolves to false, spec.md §4.1.
            ai_enabled: false,
            tier1_threshold: 0.85,
            tier1_5_threshold: 0.80,
            tier2_threshold: 0.80,
            tier3_threshold: 0.70,
            max_cost_per_document: 0.05,
            abort_on_cost_exceeded: false,
            document_type_thresholds: HashMap::new(),
            custom_patterns: HashMap::new(),
        }
    }
}

impl Settings {
    /// Effective Tier 1 (and, by convention, Tier 1.5 in the absence of a
    /// dedicated key — see `DESIGN.md` Open Question) threshold for a
    /// certificate type: `documentTypeThresholds[type] ?? permissiveDefault
    /// ?? tierDefault` (`spec.md` §3: "Document types flagged 'permissive'
    /// (FRA, BSC, ASB — bar at 0.70-0.75 by default)").
    pub fn effective_threshold(&self, tier_default: f64, cert_type: &CertificateType) -> f64 {
        self.document_type_thresholds
            .get(&cert_type.code())
            .copied()
            .or_else(|| cert_type.permissive_default_threshold())
            .unwrap_or(tier_default)
    }
}

/// Loads a `Settings` snapshot from a `SettingsStore`, applying defaults and
/// coercion per `spec.md` §4.1 and §6.
pub struct SettingsLoader;

impl SettingsLoader {
    pub async fn load(store: &dyn SettingsStore) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(raw) = Self::first_present(store, &["AI_EXTRACTION_ENABLED", "extraction.enableAIProcessing"]).await? {
            settings.ai_enabled = parse_bool(&raw);
        }

        settings.tier1_threshold = Self::parse_f64_or(
            store,
            "TIER1_CONFIDENCE_THRESHOLD",
            settings.tier1_threshold,
        )
        .await;
        settings.tier1_5_threshold = Self::parse_f64_or(
            store,
            "TIER1_5_CONFIDENCE_THRESHOLD",
            settings.tier1_5_threshold,
        )
        .await;
        settings.tier2_threshold = Self::parse_f64_or(
            store,
            "TIER2_CONFIDENCE_THRESHOLD",
            settings.tier2_threshold,
        )
        .await;
        settings.tier3_threshold = Self::parse_f64_or(
            store,
            "TIER3_CONFIDENCE_THRESHOLD",
            settings.tier3_threshold,
        )
        .await;
        settings.max_cost_per_document = Self::parse_f64_or(
            store,
            "MAX_COST_PER_DOCUMENT",
            settings.max_cost_per_document,
        )
        .await;

        if let Ok(Some(raw)) = store.get("DOCUMENT_TYPE_THRESHOLDS").await {
            match serde_json::from_str::<HashMap<String, f64>>(&raw) {
                Ok(map) => settings.document_type_thresholds = map,
                Err(err) => warn!(error = %err, "failed to parse DOCUMENT_TYPE_THRESHOLDS, using defaults"),
            }
        }

        if let Ok(Some(raw)) = store.get("CUSTOM_EXTRACTION_PATTERNS").await {
            match serde_json::from_str::<HashMap<String, HashMap<String, Vec<String>>>>(&raw) {
                Ok(map) => settings.custom_patterns = map,
                Err(err) => warn!(error = %err, "failed to parse CUSTOM_EXTRACTION_PATTERNS, using defaults"),
            }
        }

        Ok(settings)
    }

    async fn first_present(store: &dyn SettingsStore, keys: &[&str]) -> Result<Option<String>> {
        for key in keys {
            if let Some(value) = store.get(key).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    async fn parse_f64_or(store: &dyn SettingsStore, key: &str, default: f64) -> f64 {
        match store.get(key).await {
            Ok(Some(raw)) => raw.trim().parse::<f64>().unwrap_or(default),
            _ => default,
        }
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// An in-memory `SettingsStore`, useful for tests and for callers that keep
/// settings in a local map rather than a remote store.
pub struct InMemorySettingsStore {
    values: HashMap<String, String>,
    patterns: Vec<DetectionPatternRow>,
}

impl InMemorySettingsStore {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values, patterns: Vec::new() }
    }

    pub fn with_patterns(mut self, patterns: Vec<DetectionPatternRow>) -> Self {
        self.patterns = patterns;
        self
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    async fn detection_patterns(&self) -> Result<Vec<DetectionPatternRow>> {
        Ok(self.patterns.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_ai_enabled_key_is_fail_closed() {
        let store = InMemorySettingsStore::new(HashMap::new());
        let settings = SettingsLoader::load(&store).await.unwrap();
        assert!(!settings.ai_enabled);
    }

    #[tokio::test]
    async fn parses_document_type_thresholds() {
        let mut values = HashMap::new();
        values.insert(
            "DOCUMENT_TYPE_THRESHOLDS".to_string(),
            r#"{"FRA": 0.70}"#.to_string(),
        );
        let store = InMemorySettingsStore::new(values);
        let settings = SettingsLoader::load(&store).await.unwrap();
        assert_eq!(settings.document_type_thresholds.get("FRA"), Some(&0.70));
    }

    #[tokio::test]
    async fn invalid_json_falls_back_to_defaults() {
        let mut values = HashMap::new();
        values.insert("DOCUMENT_TYPE_THRESHOLDS".to_string(), "{not json".to_string());
        let store = InMemorySettingsStore::new(values);
        let settings = SettingsLoader::load(&store).await.unwrap();
        assert!(settings.document_type_thresholds.is_empty());
    }

    #[test]
    fn effective_threshold_prefers_override() {
        let mut settings = Settings::default();
        settings.document_type_thresholds.insert("FRA".to_string(), 0.70);
        let eff = settings.effective_threshold(settings.tier1_threshold, &CertificateType::Fra);
        assert_eq!(eff, 0.70);
        let eff_gas = settings.effective_threshold(settings.tier1_threshold, &CertificateType::Gas);
        assert_eq!(eff_gas, 0.85);
    }
}
