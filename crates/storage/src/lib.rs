pub mod db;
pub mod ledger;
pub mod payments;

pub use db::{create_db, DbPool, StorageError};
pub use ledger::{
    apply_invoice_payment, insert_invoice, insert_lease, insert_payment_channel,
    list_active_leases, list_outstanding_invoices, list_payment_channels,
    load_reconciliation_context,
};
pub use payments::{
    count_payment_events, find_payment_event, insert_payment_event, insert_upload_run,
    list_upload_runs, record_payment, update_payment_event_match, InvoiceSettlement,
    RecordedPayment,
};
