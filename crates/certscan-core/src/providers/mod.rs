//! C6 — Provider Registry.
//!
//! A process-wide, capability-indexed catalogue of LLM/vision/OCR/document-
//! intelligence adapters (`spec.md` §4.6, §6). Generalised from the
//! teacher's `Plugin` trait (`name`/`version`/`initialize`/`shutdown`,
//! `extractors/docx.rs`) into one base trait plus a trait per capability,
//! the shape `spec.md` §9 "Polymorphic provider list" calls for: "a
//! trait/interface per capability ... registry stores
//! `Map<Capability, Vec<Arc<dyn ProviderForCapability>>>`".

pub mod circuit_breaker;

use crate::error::{CertScanError, Result};
use crate::types::CertificateType;
use async_trait::async_trait;
use circuit_breaker::{get_or_register_circuit, CircuitBreakerConfig};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Context threaded through every provider call, `spec.md` §6
/// "TextExtraction.extractFromText(text, schema, context)".
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub certificate_type: CertificateType,
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    TextExtraction,
    Vision,
    Ocr,
    DocumentIntelligence,
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

/// Shape shared by `TextExtraction`/`Vision`/`OCR`/`DocumentIntelligence`
/// call results, `spec.md` §6.
#[derive(Debug, Clone)]
pub struct ProviderCallResult {
    pub provider: String,
    pub success: bool,
    pub data: Option<Value>,
    pub confidence: f64,
    pub cost: f64,
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OcrCallResult {
    pub provider: String,
    pub success: bool,
    pub text: Option<String>,
    pub confidence: f64,
    pub cost: f64,
    pub page_count: u32,
}

#[derive(Debug, Clone)]
pub struct DocumentIntelligenceResult {
    pub provider: String,
    pub success: bool,
    pub text: Option<String>,
    pub structured_data: Option<Value>,
    pub confidence: f64,
    pub cost: f64,
    pub page_count: u32,
}

/// Capability-agnostic provider identity, the generalisation of the
/// teacher's `Plugin` trait.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;
    fn priority(&self) -> i32;
    fn cost_per_call(&self) -> f64;
    fn is_configured(&self) -> bool;

    /// `spec.md` §4.6: "Health checks ... may be cached". The registry owns
    /// the cache; providers just answer truthfully each call.
    async fn health_check(&self) -> HealthStatus;

    fn circuit_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
    }
}

#[async_trait]
pub trait TextExtractionProvider: Provider {
    async fn extract_from_text(
        &self,
        text: &str,
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult>;
}

#[async_trait]
pub trait VisionProvider: Provider {
    /// Whether this provider can run vision extraction directly against PDF
    /// bytes (`spec.md` §4.6 "For Vision + PDF, only providers advertising
    /// PDF-capable vision are tried").
    fn supports_pdf_vision(&self) -> bool {
        false
    }

    async fn extract_from_image(
        &self,
        bytes: &[u8],
        mime: &str,
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult>;

    async fn extract_from_pdf(
        &self,
        pdf_bytes: &[u8],
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult>;
}

#[async_trait]
pub trait OcrProvider: Provider {
    async fn extract_text(&self, bytes: &[u8], mime: &str) -> Result<OcrCallResult>;
}

#[async_trait]
pub trait DocumentIntelligenceProvider: Provider {
    async fn analyze_document(&self, bytes: &[u8], mime: &str) -> Result<DocumentIntelligenceResult>;
}

const HEALTH_CACHE_TTL: Duration = Duration::from_secs(30);

struct CachedHealth {
    status: HealthStatus,
    checked_at: Instant,
}

/// Process-wide catalogue of configured providers, indexed by capability.
/// Constructed once and populated from settings; health-check refresh is the
/// only mutation after that (`spec.md` §9 "Singleton lazy init").
#[derive(Default)]
pub struct ProviderRegistry {
    text_extraction: Vec<Arc<dyn TextExtractionProvider>>,
    vision: Vec<Arc<dyn VisionProvider>>,
    ocr: Vec<Arc<dyn OcrProvider>>,
    document_intelligence: Vec<Arc<dyn DocumentIntelligenceProvider>>,
}

static HEALTH_CACHE: Lazy<DashMap<String, CachedHealth>> = Lazy::new(DashMap::new);

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_text_extraction(&mut self, provider: Arc<dyn TextExtractionProvider>) {
        self.text_extraction.push(provider);
        self.text_extraction.sort_by_key(|p| p.priority());
    }

    pub fn register_vision(&mut self, provider: Arc<dyn VisionProvider>) {
        self.vision.push(provider);
        self.vision.sort_by_key(|p| p.priority());
    }

    pub fn register_ocr(&mut self, provider: Arc<dyn OcrProvider>) {
        self.ocr.push(provider);
        self.ocr.sort_by_key(|p| p.priority());
    }

    pub fn register_document_intelligence(&mut self, provider: Arc<dyn DocumentIntelligenceProvider>) {
        self.document_intelligence.push(provider);
        self.document_intelligence.sort_by_key(|p| p.priority());
    }

    async fn is_healthy(provider: &dyn Provider) -> bool {
        let name = provider.name().to_string();
        if let Some(cached) = HEALTH_CACHE.get(&name) {
            if cached.checked_at.elapsed() < HEALTH_CACHE_TTL {
                return cached.status.is_healthy;
            }
        }
        let status = provider.health_check().await;
        let is_healthy = status.is_healthy;
        HEALTH_CACHE.insert(name, CachedHealth { status, checked_at: Instant::now() });
        is_healthy
    }

    pub async fn call_text_extraction(
        &self,
        text: &str,
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult> {
        for provider in &self.text_extraction {
            if !provider.is_configured() || !Self::is_healthy(provider.as_ref()).await {
                continue;
            }
            let breaker = get_or_register_circuit(provider.name(), provider.circuit_config());
            if !breaker.lock().allow() {
                warn!(provider = provider.name(), "circuit open, skipping provider");
                continue;
            }
            match provider.extract_from_text(text, schema, context).await {
                Ok(mut result) => {
                    result.provider = provider.name().to_string();
                    breaker.lock().record_success();
                    return Ok(result);
                }
                Err(err) => {
                    breaker.lock().record_failure();
                    debug!(provider = provider.name(), error = %err, "text extraction provider failed, trying next");
                }
            }
        }
        Err(CertScanError::provider("text-extraction", "no healthy provider available"))
    }

    pub async fn call_vision_image(
        &self,
        bytes: &[u8],
        mime: &str,
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult> {
        for provider in &self.vision {
            if !provider.is_configured() || !Self::is_healthy(provider.as_ref()).await {
                continue;
            }
            let breaker = get_or_register_circuit(provider.name(), provider.circuit_config());
            if !breaker.lock().allow() {
                continue;
            }
            match provider.extract_from_image(bytes, mime, schema, context).await {
                Ok(mut result) => {
                    result.provider = provider.name().to_string();
                    breaker.lock().record_success();
                    return Ok(result);
                }
                Err(err) => {
                    breaker.lock().record_failure();
                    debug!(provider = provider.name(), error = %err, "vision provider failed, trying next");
                }
            }
        }
        Err(CertScanError::provider("vision", "no healthy provider available"))
    }

    pub async fn call_vision_pdf(
        &self,
        pdf_bytes: &[u8],
        schema: &Value,
        context: &ExtractionContext,
    ) -> Result<ProviderCallResult> {
        for provider in self.vision.iter().filter(|p| p.supports_pdf_vision()) {
            if !provider.is_configured() || !Self::is_healthy(provider.as_ref()).await {
                continue;
            }
            let breaker = get_or_register_circuit(provider.name(), provider.circuit_config());
            if !breaker.lock().allow() {
                continue;
            }
            match provider.extract_from_pdf(pdf_bytes, schema, context).await {
                Ok(mut result) => {
                    result.provider = provider.name().to_string();
                    breaker.lock().record_success();
                    return Ok(result);
                }
                Err(err) => {
                    breaker.lock().record_failure();
                    debug!(provider = provider.name(), error = %err, "pdf-vision provider failed, trying next");
                }
            }
        }
        Err(CertScanError::provider("vision-pdf", "no PDF-capable vision provider available"))
    }

    pub async fn call_ocr(&self, bytes: &[u8], mime: &str) -> Result<OcrCallResult> {
        for provider in &self.ocr {
            if !provider.is_configured() || !Self::is_healthy(provider.as_ref()).await {
                continue;
            }
            let breaker = get_or_register_circuit(provider.name(), provider.circuit_config());
            if !breaker.lock().allow() {
                continue;
            }
            match provider.extract_text(bytes, mime).await {
                Ok(mut result) => {
                    result.provider = provider.name().to_string();
                    breaker.lock().record_success();
                    return Ok(result);
                }
                Err(err) => {
                    breaker.lock().record_failure();
                    debug!(provider = provider.name(), error = %err, "ocr provider failed, trying next");
                }
            }
        }
        Err(CertScanError::provider("ocr", "no healthy provider available"))
    }

    /// `spec.md` §4.6: "For Document Intelligence, if no DI provider is
    /// healthy, the registry falls back to the OCR capability."
    pub async fn call_document_intelligence(
        &self,
        bytes: &[u8],
        mime: &str,
    ) -> Result<DocumentIntelligenceResult> {
        for provider in &self.document_intelligence {
            if !provider.is_configured() || !Self::is_healthy(provider.as_ref()).await {
                continue;
            }
            let breaker = get_or_register_circuit(provider.name(), provider.circuit_config());
            if !breaker.lock().allow() {
                continue;
            }
            match provider.analyze_document(bytes, mime).await {
                Ok(mut result) => {
                    result.provider = provider.name().to_string();
                    breaker.lock().record_success();
                    return Ok(result);
                }
                Err(err) => {
                    breaker.lock().record_failure();
                    debug!(provider = provider.name(), error = %err, "document intelligence provider failed, trying next");
                }
            }
        }

        debug!("no healthy document intelligence provider, falling back to ocr");
        let ocr = self.call_ocr(bytes, mime).await?;
        Ok(DocumentIntelligenceResult {
            provider: ocr.provider,
            success: ocr.success,
            text: ocr.text,
            structured_data: None,
            confidence: ocr.confidence,
            cost: ocr.cost,
            page_count: ocr.page_count,
        })
    }

    pub fn has_text_extraction_provider(&self) -> bool {
        self.text_extraction.iter().any(|p| p.is_configured())
    }

    pub fn has_vision_provider(&self) -> bool {
        self.vision.iter().any(|p| p.is_configured())
    }

    pub fn has_document_intelligence_or_ocr_provider(&self) -> bool {
        self.document_intelligence.iter().any(|p| p.is_configured())
            || self.ocr.iter().any(|p| p.is_configured())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyTextProvider {
        name: &'static str,
        priority: i32,
        fails: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Provider for FlakyTextProvider {
        fn name(&self) -> &str {
            self.name
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        fn cost_per_call(&self) -> f64 {
            0.01
        }
        fn is_configured(&self) -> bool {
            true
        }
        async fn health_check(&self) -> HealthStatus {
            HealthStatus { is_healthy: true, latency_ms: Some(1), error: None }
        }
    }

    #[async_trait]
    impl TextExtractionProvider for FlakyTextProvider {
        async fn extract_from_text(
            &self,
            _text: &str,
            _schema: &Value,
            _context: &ExtractionContext,
        ) -> Result<ProviderCallResult> {
            use std::sync::atomic::Ordering;
            if self.fails.fetch_add(1, Ordering::SeqCst) == 0 && self.name == "flaky" {
                return Err(CertScanError::provider(self.name, "simulated failure"));
            }
            Ok(ProviderCallResult {
                provider: self.name.to_string(),
                success: true,
                data: Some(serde_json::json!({"provider": self.name})),
                confidence: 0.9,
                cost: self.cost_per_call(),
                raw_response: None,
            })
        }
    }

    #[tokio::test]
    async fn falls_through_to_next_provider_on_failure() {
        let mut registry = ProviderRegistry::new();
        registry.register_text_extraction(Arc::new(FlakyTextProvider {
            name: "flaky",
            priority: 0,
            fails: std::sync::atomic::AtomicUsize::new(0),
        }));
        registry.register_text_extraction(Arc::new(FlakyTextProvider {
            name: "backup",
            priority: 1,
            fails: std::sync::atomic::AtomicUsize::new(0),
        }));

        let ctx = ExtractionContext { certificate_type: CertificateType::Gas, filename: "a.pdf".into() };
        let result = registry
            .call_text_extraction("hello", &serde_json::json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.data.unwrap()["provider"], "backup");
    }

    #[tokio::test]
    async fn no_providers_returns_provider_error() {
        let registry = ProviderRegistry::new();
        let ctx = ExtractionContext { certificate_type: CertificateType::Gas, filename: "a.pdf".into() };
        let result = registry.call_text_extraction("hello", &serde_json::json!({}), &ctx).await;
        assert!(result.is_err());
    }
}
