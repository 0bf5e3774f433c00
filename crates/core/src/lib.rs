pub mod dialect;
pub mod event;
pub mod ledger;
pub mod money;
pub mod reconciliation;
pub mod transaction;

pub use dialect::{Dialect, UnknownDialect};
pub use event::{OutcomeStatus, PaymentEvent, ReconciliationStatus, TransactionOutcome, UploadRun};
pub use ledger::{ChannelKind, Lease, OutstandingInvoice, PaymentChannel, ReconciliationContext};
pub use money::Money;
pub use reconciliation::{MatchMethod, ReconciliationResult};
pub use transaction::{Direction, NormalizedTransaction, RawRow};
