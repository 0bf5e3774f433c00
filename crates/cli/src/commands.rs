use std::path::Path;

use anyhow::{bail, Context};
use kodi_core::{Lease, OutstandingInvoice, PaymentChannel};
use kodi_import::{detect_with_signal, parse_statement, MatcherConfig, ReconciliationMatcher};
use kodi_ingest::{Ingestor, StatementUpload};
use kodi_storage::{create_db, DbPool};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cli::{Cli, Commands};

/// Contents of a `load-ledger` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LedgerFile {
    pub leases: Vec<Lease>,
    pub channels: Vec<PaymentChannel>,
    pub invoices: Vec<OutstandingInvoice>,
}

impl LedgerFile {
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}

/// Runs one command and returns what should be printed.
pub async fn run(cli: Cli) -> anyhow::Result<Value> {
    match cli.command {
        Commands::Detect { path } => {
            let content = read_statement(&path).await?;
            let file_name = file_name(&path);
            match detect_with_signal(&content, &file_name) {
                Some((dialect, signal)) => Ok(json!({
                    "file": file_name,
                    "dialect": dialect,
                    "signal": signal.as_str(),
                })),
                None => bail!("{file_name}: statement format not recognized"),
            }
        }
        Commands::Parse { path, dialect } => {
            let content = read_statement(&path).await?;
            let file_name = file_name(&path);
            let parsed = parse_statement(&content, &file_name, dialect.as_deref())
                .with_context(|| format!("failed to parse {file_name}"))?;
            Ok(json!({
                "file": file_name,
                "dialect": parsed.dialect,
                "transactions": parsed.transactions,
            }))
        }
        Commands::Ingest { path, landlord, dialect } => {
            let matcher = load_matcher(cli.matcher_config.as_deref()).await?;
            let pool = open_db(&cli.db).await?;
            let content = read_statement(&path).await?;
            let file_name = file_name(&path);

            let ingestor = Ingestor::new(pool, matcher);
            let run = ingestor
                .ingest_file(StatementUpload {
                    file_name: &file_name,
                    content: &content,
                    declared_dialect: dialect.as_deref(),
                    landlord_id: &landlord,
                })
                .await
                .with_context(|| format!("failed to ingest {file_name}"))?;
            Ok(serde_json::to_value(&run)?)
        }
        Commands::LoadLedger { path } => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let ledger = LedgerFile::from_toml(&text)
                .with_context(|| format!("invalid ledger file {}", path.display()))?;
            let pool = open_db(&cli.db).await?;
            load_ledger(&pool, &ledger).await?;
            tracing::info!(
                leases = ledger.leases.len(),
                channels = ledger.channels.len(),
                invoices = ledger.invoices.len(),
                "ledger loaded"
            );
            Ok(json!({
                "leases": ledger.leases.len(),
                "channels": ledger.channels.len(),
                "invoices": ledger.invoices.len(),
            }))
        }
        Commands::Runs { limit } => {
            let pool = open_db(&cli.db).await?;
            let runs = kodi_storage::list_upload_runs(&pool, limit).await?;
            let summaries: Vec<Value> = runs
                .iter()
                .map(|r| {
                    json!({
                        "id": r.id,
                        "file_name": r.file_name,
                        "dialect": r.dialect,
                        "landlord_id": r.landlord_id,
                        "total": r.total,
                        "matched": r.matched,
                        "unmatched": r.unmatched,
                        "duplicates": r.duplicates,
                        "errors": r.errors,
                        "created_at": r.created_at,
                    })
                })
                .collect();
            Ok(Value::Array(summaries))
        }
    }
}

async fn load_ledger(pool: &DbPool, ledger: &LedgerFile) -> anyhow::Result<()> {
    for lease in &ledger.leases {
        kodi_storage::insert_lease(pool, lease)
            .await
            .with_context(|| format!("failed to insert lease {}", lease.id))?;
    }
    for channel in &ledger.channels {
        kodi_storage::insert_payment_channel(pool, channel).await?;
    }
    for invoice in &ledger.invoices {
        kodi_storage::insert_invoice(pool, invoice)
            .await
            .with_context(|| format!("failed to insert invoice {}", invoice.id))?;
    }
    Ok(())
}

async fn load_matcher(path: Option<&Path>) -> anyhow::Result<ReconciliationMatcher> {
    let Some(path) = path else {
        return Ok(ReconciliationMatcher::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read matcher config {}", path.display()))?;
    let config = MatcherConfig::from_toml(&text)?;
    Ok(ReconciliationMatcher::new(config))
}

async fn open_db(path: &Path) -> anyhow::Result<DbPool> {
    create_db(path)
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

async fn read_statement(path: &Path) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    // Bank exports are not always valid UTF-8; stray bytes in narratives are replaced.
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
