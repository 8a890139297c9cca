//! Extract command - run the tiered orchestrator over a single certificate
//! document, or a batch of them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use certscan_core::{
    extract_certificate, flush_audit, AuditSink, ExtractionOptions, ExtractionResult, InMemorySettingsStore,
    NoopAuditSink, ProviderRegistry,
};

use crate::OutputFormat;

/// Execute single-document extraction.
#[allow(clippy::too_many_arguments)]
pub async fn extract_command(
    path: PathBuf,
    mime_type: Option<String>,
    force_ai: bool,
    max_cost: Option<f64>,
    format: OutputFormat,
) -> Result<()> {
    let bytes = std::fs::read(&path)
        .with_context(|| format!("failed to read file '{}'. Ensure the path exists and is readable.", path.display()))?;

    let result = run_one(&path, &bytes, mime_type.as_deref(), force_ai, max_cost).await?;

    print_result(&path, &result, format)?;
    Ok(())
}

/// Execute extraction over several documents, one after another.
pub async fn batch_command(paths: Vec<PathBuf>, force_ai: bool, max_cost: Option<f64>, format: OutputFormat) -> Result<()> {
    let mut results = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read file '{}' during batch extraction", path.display()))?;
        let result = run_one(path, &bytes, None, force_ai, max_cost).await?;
        results.push((path.clone(), result));
    }

    match format {
        OutputFormat::Text => {
            for (i, (path, result)) in results.iter().enumerate() {
                println!("=== Document {} ({}) ===", i + 1, path.display());
                print_text_summary(result);
                println!();
            }
        }
        OutputFormat::Json => {
            let payload: Vec<&ExtractionResult> = results.iter().map(|(_, r)| r).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize batch extraction results to JSON")?
            );
        }
    }

    Ok(())
}

async fn run_one(
    path: &Path,
    bytes: &[u8],
    mime_type: Option<&str>,
    force_ai: bool,
    max_cost: Option<f64>,
) -> Result<ExtractionResult> {
    let certificate_id = path.to_string_lossy().to_string();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| certificate_id.clone());

    let store = InMemorySettingsStore::new(Default::default());
    // No provider adapters are wired here: `certscan-cli` is a thin shell
    // over the orchestrator, which already degrades to template-only /
    // manual-review results when the registry is empty. Production
    // deployments wire real AI provider adapters into the registry
    // themselves (`spec.md` §6 "external interfaces").
    let registry = ProviderRegistry::new();
    let sink: &dyn AuditSink = &NoopAuditSink;

    let mut options = ExtractionOptions::new().force_ai(force_ai);
    if let Some(max_cost) = max_cost {
        options = options.max_cost(max_cost);
    }

    let result = extract_certificate(&certificate_id, bytes, &filename, mime_type, &store, &registry, sink, options)
        .await
        .with_context(|| format!("extraction failed for '{}'", path.display()))?;

    flush_audit(sink, &result).await;
    Ok(result)
}

fn print_result(path: &Path, result: &ExtractionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_text_summary(result),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(result).context("failed to serialize extraction result to JSON")?
            );
        }
    }
    let _ = path;
    Ok(())
}

fn print_text_summary(result: &ExtractionResult) {
    println!("success: {}", result.success);
    println!("final tier: {}", result.final_tier);
    println!("confidence: {:.2}", result.confidence);
    println!("requires review: {}", result.requires_review);
    println!("total cost: {:.4}", result.total_cost);
    println!("processing time: {}ms", result.total_processing_time_ms);
    if !result.warnings.is_empty() {
        println!("warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
    println!("tier audit:");
    for entry in &result.tier_audit {
        println!(
            "  [{}] status={:?} confidence={:.2} cost={:.4}",
            entry.tier, entry.status, entry.confidence, entry.cost
        );
    }
}
