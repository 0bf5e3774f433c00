//! Turns uploaded statements into stored, reconciled payment events.

pub mod hash;
pub mod ingestor;
pub mod store;

pub use hash::content_hash;
pub use ingestor::{IngestError, IngestRequest, Ingestor, StatementUpload};
pub use store::PaymentStore;
