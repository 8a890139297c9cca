//! `certscan` — command-line front end for the CertScan compliance
//! certificate extraction orchestrator.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Output format shared by `extract` and `batch`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    Text,
    /// Full `ExtractionResult`, pretty-printed.
    Json,
}

#[derive(Parser)]
#[command(name = "certscan", version, about = "Tiered compliance-certificate document extraction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a single certificate document.
    Extract {
        /// Path to the document to extract.
        path: PathBuf,
        /// Declared MIME type, if known (otherwise sniffed).
        #[arg(long)]
        mime_type: Option<String>,
        /// Force AI-assisted tiers on even if settings disable them.
        #[arg(long)]
        force_ai: bool,
        /// Override the per-document cost ceiling.
        #[arg(long)]
        max_cost: Option<f64>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Extract several certificate documents in sequence.
    Batch {
        /// Paths to the documents to extract.
        paths: Vec<PathBuf>,
        /// Force AI-assisted tiers on even if settings disable them.
        #[arg(long)]
        force_ai: bool,
        /// Override the per-document cost ceiling.
        #[arg(long)]
        max_cost: Option<f64>,
        /// Output format.
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { path, mime_type, force_ai, max_cost, format } => {
            commands::extract::extract_command(path, mime_type, force_ai, max_cost, format).await
        }
        Commands::Batch { paths, force_ai, max_cost, format } => {
            commands::extract::batch_command(paths, force_ai, max_cost, format).await
        }
    }
}
