use kodi_core::{
    Dialect, NormalizedTransaction, PaymentEvent, TransactionOutcome, UploadRun,
};
use kodi_import::{parse_statement, ReconciliationMatcher, StatementError};
use kodi_storage::StorageError;
use thiserror::Error;

use crate::hash::content_hash;
use crate::store::PaymentStore;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The statement could not be read at all. Nothing was persisted.
    #[error(transparent)]
    Statement(#[from] StatementError),
    /// Writing the upload summary failed. Payment events may already be stored.
    #[error("Failed to record upload run: {0}")]
    Storage(#[from] StorageError),
}

/// Already-parsed transactions to store and reconcile.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub file_name: String,
    pub dialect: Dialect,
    pub provider: String,
    pub landlord_id: String,
    pub content_hash: Option<String>,
    pub transactions: Vec<NormalizedTransaction>,
}

/// A raw statement file as uploaded by a landlord.
#[derive(Debug, Clone, Copy)]
pub struct StatementUpload<'a> {
    pub file_name: &'a str,
    pub content: &'a str,
    /// Overrides format detection when set.
    pub declared_dialect: Option<&'a str>,
    pub landlord_id: &'a str,
}

/// Stores each transaction as a payment event, reconciles it, and keeps a
/// per-upload summary.
///
/// Transactions are handled one at a time in file order. A failure on one
/// transaction is counted and the batch carries on; re-running an upload is
/// always safe because events are keyed by `(provider, reference)`.
pub struct Ingestor<S: PaymentStore> {
    store: S,
    matcher: ReconciliationMatcher,
}

impl<S: PaymentStore> Ingestor<S> {
    pub fn new(store: S, matcher: ReconciliationMatcher) -> Self {
        Self { store, matcher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Detects the format, parses, and ingests a statement. A statement that
    /// cannot be parsed fails before anything is written.
    pub async fn ingest_file(&self, upload: StatementUpload<'_>) -> Result<UploadRun, IngestError> {
        let parsed = parse_statement(upload.content, upload.file_name, upload.declared_dialect)?;
        self.ingest(IngestRequest {
            file_name: upload.file_name.to_string(),
            dialect: parsed.dialect,
            provider: parsed.dialect.as_str().to_string(),
            landlord_id: upload.landlord_id.to_string(),
            content_hash: Some(content_hash(upload.content.as_bytes())),
            transactions: parsed.transactions,
        })
        .await
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<UploadRun, IngestError> {
        let mut run = UploadRun::new(
            &request.file_name,
            request.dialect,
            &request.provider,
            &request.landlord_id,
        );
        run.content_hash = request.content_hash;

        for tx in &request.transactions {
            let outcome = match self.process(tx, &request.provider, &request.landlord_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(reference = %tx.reference, error = %e, "failed to ingest transaction");
                    TransactionOutcome::error(tx, e.to_string())
                }
            };
            run.record(outcome);
        }

        let id = self.store.save_run(&run).await?;
        run.id = Some(id);

        tracing::info!(
            run_id = id,
            file = %run.file_name,
            dialect = %run.dialect,
            total = run.total,
            matched = run.matched,
            unmatched = run.unmatched,
            duplicates = run.duplicates,
            errors = run.errors,
            "upload ingested"
        );
        Ok(run)
    }

    async fn process(
        &self,
        tx: &NormalizedTransaction,
        provider: &str,
        landlord_id: &str,
    ) -> Result<TransactionOutcome, StorageError> {
        if self.store.find_event(provider, &tx.reference).await?.is_some() {
            tracing::debug!(reference = %tx.reference, "duplicate transaction");
            return Ok(TransactionOutcome::duplicate(tx));
        }

        // Re-read so payments applied earlier in this run are visible.
        let ctx = self.store.load_context(landlord_id).await?;
        let result = self.matcher.reconcile(tx, &ctx);

        let event = PaymentEvent::from_transaction(tx, provider, landlord_id);
        // A concurrent upload may have inserted the same key since the lookup.
        let Some(recorded) = self.store.record_payment(&event, &result).await? else {
            return Ok(TransactionOutcome::duplicate(tx));
        };

        if let Some(settlement) = &recorded.invoice {
            tracing::debug!(
                event_id = recorded.event_id,
                invoice_id = %settlement.invoice_id,
                remaining = %settlement.remaining,
                "payment applied"
            );
            if settlement.unapplied.is_positive() {
                tracing::warn!(
                    reference = %tx.reference,
                    invoice_id = %settlement.invoice_id,
                    unapplied = %settlement.unapplied,
                    "payment exceeds invoice balance"
                );
            }
        }

        Ok(TransactionOutcome::reconciled(tx, &result))
    }
}
