//! C11 — Audit Sink.
//!
//! External contract for persisting `TierAuditEntry` rows. Writes are
//! fire-and-forget with respect to the extraction result: failures are
//! logged and swallowed, never surfaced to the caller (`spec.md` §3 "Audit
//! sink", §4.10, §7).

use crate::types::TierAuditEntry;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::error;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn write(&self, entry: &TierAuditEntry) -> Result<(), String>;
}

/// Writes every entry through the sink, logging (never propagating) a
/// failure. The orchestrator calls this at each decision point.
pub async fn record(sink: &dyn AuditSink, entry: &TierAuditEntry) {
    if let Err(err) = sink.write(entry).await {
        error!(
            certificate_id = entry.certificate_id,
            tier = %entry.tier,
            error = err,
            "audit sink write failed, continuing"
        );
    }
}

/// Discards every row. Useful as a default when no sink is wired up.
#[derive(Debug, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn write(&self, _entry: &TierAuditEntry) -> Result<(), String> {
        Ok(())
    }
}

/// Buffers rows in memory, useful for tests and for callers who want the
/// audit trail without standing up a real store.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<TierAuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TierAuditEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn write(&self, entry: &TierAuditEntry) -> Result<(), String> {
        self.entries.lock().push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExtractionTier, TierStatus};

    fn sample_entry() -> TierAuditEntry {
        crate::types::TierAuditBuilder::new("cert-1", ExtractionTier::Tier0, 0)
            .status(TierStatus::Success)
            .confidence(1.0)
            .build()
    }

    #[tokio::test]
    async fn noop_sink_accepts_writes_silently() {
        let sink = NoopAuditSink;
        record(&sink, &sample_entry()).await;
    }

    #[tokio::test]
    async fn in_memory_sink_retains_entries() {
        let sink = InMemoryAuditSink::new();
        record(&sink, &sample_entry()).await;
        assert_eq!(sink.entries().len(), 1);
    }
}
