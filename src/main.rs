use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use crpt_api::{config::ApiConfig, models::Document, CrptApi};
use tokio::task::JoinSet;
use tracing::{error, info};

/// Submit signed documents to the CRPT API without exceeding the configured
/// request rate.
#[derive(Debug, Parser)]
#[command(name = "crpt-submit", version)]
struct Cli {
    /// Detached signature sent in the `Signature` header
    #[arg(long, env = "CRPT_SIGNATURE")]
    signature: String,

    /// Document JSON files to submit
    #[arg(required = true)]
    documents: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            error!("{} submission(s) failed", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<usize> {
    let config = ApiConfig::from_env().context("failed to load configuration")?;
    let api = CrptApi::from_config(&config)?;
    info!(
        "Submitting {} document(s) to {} ({} per {:?})",
        cli.documents.len(),
        api.client().url(),
        api.gate().limit(),
        api.gate().interval()
    );

    let mut documents = Vec::with_capacity(cli.documents.len());
    for path in &cli.documents {
        documents.push((path.clone(), load_document(path).await?));
    }

    let mut tasks = JoinSet::new();
    for (path, document) in documents {
        let api = api.clone();
        let signature = cli.signature.clone();
        tasks.spawn(async move {
            let result = api.create_document(&document, &signature).await;
            (path, result)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (path, result) = joined.context("submission task panicked")?;
        match result {
            Ok(receipt) => info!("{}: accepted ({})", path.display(), receipt.status),
            Err(e) => {
                failed += 1;
                error!("{}: {}", path.display(), e);
            }
        }
    }

    let mut stats: Vec<_> = api.gate().stats().into_iter().collect();
    stats.sort();
    for (key, value) in stats {
        info!("gate {} = {}", key, value);
    }

    Ok(failed)
}

async fn load_document(path: &Path) -> Result<Document> {
    let raw = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("invalid document in {}", path.display()))
}
