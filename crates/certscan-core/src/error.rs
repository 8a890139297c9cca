//! Error types for the extraction core.
//!
//! Mirrors the teacher crate's `KreuzbergError` shape (named variants with a
//! `message` plus an optional boxed source), but none of these variants ever
//! escape the public entry point: the orchestrator (`orchestrator.rs`) always
//! catches them at the tier boundary, records a `Failed` audit row, and
//! continues — see `spec.md` §7.

use std::fmt;

pub type Result<T> = std::result::Result<T, CertScanError>;

#[derive(Debug, thiserror::Error)]
pub enum CertScanError {
    /// Container/text-layer parse failure (PDF, image, QR, EXIF, office).
    /// `spec.md` §7: degrades to empty text / empty QR list, never aborts.
    #[error("parse error in {stage}: {message}")]
    Parse {
        stage: &'static str,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A provider adapter (LLM/vision/OCR/document-intelligence) failed.
    #[error("provider '{provider}' error: {message}")]
    Provider { provider: String, message: String },

    /// The circuit breaker for this provider is open.
    #[error("circuit open for provider '{provider}'")]
    CircuitOpen { provider: String },

    /// Settings-store read or JSON-valued key parse failure.
    #[error("settings error: {message}")]
    Settings { message: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl CertScanError {
    pub fn parse(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            stage,
            message: message.into(),
            source: None,
        }
    }

    pub fn parse_with_source(
        stage: &'static str,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Parse {
            stage,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings { message: message.into() }
    }
}

impl fmt::Display for CertScanErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Coarse classification of an error, used when deciding whether a failure
/// is recoverable (escalate) or not (abort). All current variants are
/// recoverable per `spec.md` §7; this exists as the seam a future
/// non-recoverable variant would hook into without changing call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertScanErrorKind {
    Parse,
    Provider,
    CircuitOpen,
    Settings,
    UnsupportedFormat,
    Io,
    Serialization,
    Other,
}

impl CertScanError {
    pub fn kind(&self) -> CertScanErrorKind {
        match self {
            Self::Parse { .. } => CertScanErrorKind::Parse,
            Self::Provider { .. } => CertScanErrorKind::Provider,
            Self::CircuitOpen { .. } => CertScanErrorKind::CircuitOpen,
            Self::Settings { .. } => CertScanErrorKind::Settings,
            Self::UnsupportedFormat(_) => CertScanErrorKind::UnsupportedFormat,
            Self::Io(_) => CertScanErrorKind::Io,
            Self::Serialization(_) => CertScanErrorKind::Serialization,
            Self::Other(_) => CertScanErrorKind::Other,
        }
    }
}
