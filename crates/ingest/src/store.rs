use async_trait::async_trait;
use kodi_core::{PaymentEvent, ReconciliationContext, ReconciliationResult, UploadRun};
use kodi_storage::{DbPool, RecordedPayment, StorageError};

/// Persistence the ingestor needs. Implemented for the SQLite pool; tests
/// wrap it to inject failures.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn find_event(
        &self,
        provider: &str,
        external_transaction_id: &str,
    ) -> Result<Option<PaymentEvent>, StorageError>;

    async fn load_context(&self, landlord_id: &str) -> Result<ReconciliationContext, StorageError>;

    /// Stores the event with its match and settles the matched invoice, all
    /// or nothing. `None` when the `(provider, external_transaction_id)` key
    /// already exists.
    async fn record_payment(
        &self,
        event: &PaymentEvent,
        result: &ReconciliationResult,
    ) -> Result<Option<RecordedPayment>, StorageError>;

    async fn save_run(&self, run: &UploadRun) -> Result<i64, StorageError>;
}

#[async_trait]
impl PaymentStore for DbPool {
    async fn find_event(
        &self,
        provider: &str,
        external_transaction_id: &str,
    ) -> Result<Option<PaymentEvent>, StorageError> {
        kodi_storage::find_payment_event(self, provider, external_transaction_id).await
    }

    async fn load_context(&self, landlord_id: &str) -> Result<ReconciliationContext, StorageError> {
        kodi_storage::load_reconciliation_context(self, landlord_id).await
    }

    async fn record_payment(
        &self,
        event: &PaymentEvent,
        result: &ReconciliationResult,
    ) -> Result<Option<RecordedPayment>, StorageError> {
        kodi_storage::record_payment(self, event, result).await
    }

    async fn save_run(&self, run: &UploadRun) -> Result<i64, StorageError> {
        kodi_storage::insert_upload_run(self, run).await
    }
}
