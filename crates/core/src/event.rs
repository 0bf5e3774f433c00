use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::money::Money;
use super::reconciliation::{MatchMethod, ReconciliationResult};
use super::transaction::{NormalizedTransaction, RawRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Unmatched,
    Matched,
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconciliationStatus::Unmatched => write!(f, "unmatched"),
            ReconciliationStatus::Matched => write!(f, "matched"),
        }
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unmatched" => Ok(ReconciliationStatus::Unmatched),
            "matched" => Ok(ReconciliationStatus::Matched),
            other => Err(format!("Unknown reconciliation status: '{other}'")),
        }
    }
}

/// Persisted record of one incoming transaction, unique per
/// `(provider, external_transaction_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: Option<i64>,
    pub provider: String,
    pub external_transaction_id: String,
    pub landlord_id: String,
    pub amount: Money,
    pub occurred_at: NaiveDateTime,
    pub narrative: String,
    pub payer_phone: Option<String>,
    pub payer_paybill: Option<String>,
    pub payer_account_ref: Option<String>,
    pub status: ReconciliationStatus,
    pub matched_invoice_id: Option<String>,
    pub matched_lease_id: Option<String>,
    pub confidence: Option<u8>,
    pub method: Option<MatchMethod>,
    pub raw: RawRow,
}

impl PaymentEvent {
    /// A fresh, unmatched event for a parsed transaction.
    pub fn from_transaction(tx: &NormalizedTransaction, provider: &str, landlord_id: &str) -> Self {
        PaymentEvent {
            id: None,
            provider: provider.to_string(),
            external_transaction_id: tx.reference.clone(),
            landlord_id: landlord_id.to_string(),
            amount: tx.amount,
            occurred_at: tx.occurred_at,
            narrative: tx.narrative.clone(),
            payer_phone: tx.payer_phone.clone(),
            payer_paybill: tx.payer_paybill.clone(),
            payer_account_ref: tx.payer_account_ref.clone(),
            status: ReconciliationStatus::Unmatched,
            matched_invoice_id: None,
            matched_lease_id: None,
            confidence: None,
            method: None,
            raw: tx.raw.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Matched,
    Unmatched,
    Duplicate,
    Error,
}

/// Per-transaction line of an upload summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionOutcome {
    pub reference: String,
    pub amount: Money,
    pub status: OutcomeStatus,
    pub invoice_id: Option<String>,
    pub lease_id: Option<String>,
    pub confidence: Option<u8>,
    pub method: Option<MatchMethod>,
    pub reasons: Vec<String>,
    pub error: Option<String>,
}

impl TransactionOutcome {
    fn bare(tx: &NormalizedTransaction, status: OutcomeStatus) -> Self {
        TransactionOutcome {
            reference: tx.reference.clone(),
            amount: tx.amount,
            status,
            invoice_id: None,
            lease_id: None,
            confidence: None,
            method: None,
            reasons: Vec::new(),
            error: None,
        }
    }

    pub fn duplicate(tx: &NormalizedTransaction) -> Self {
        Self::bare(tx, OutcomeStatus::Duplicate)
    }

    pub fn error(tx: &NormalizedTransaction, message: impl Into<String>) -> Self {
        TransactionOutcome {
            error: Some(message.into()),
            ..Self::bare(tx, OutcomeStatus::Error)
        }
    }

    pub fn reconciled(tx: &NormalizedTransaction, result: &ReconciliationResult) -> Self {
        let status = if result.matched {
            OutcomeStatus::Matched
        } else {
            OutcomeStatus::Unmatched
        };
        TransactionOutcome {
            invoice_id: result.invoice_id.clone(),
            lease_id: result.lease_id.clone(),
            confidence: Some(result.confidence),
            method: result.method,
            reasons: result.reasons.clone(),
            ..Self::bare(tx, status)
        }
    }
}

/// Summary of one statement upload. Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRun {
    pub id: Option<i64>,
    pub file_name: String,
    pub dialect: Dialect,
    pub provider: String,
    pub landlord_id: String,
    /// SHA-256 of the uploaded content, when the caller had it.
    pub content_hash: Option<String>,
    pub total: u32,
    pub matched: u32,
    pub unmatched: u32,
    pub duplicates: u32,
    pub errors: u32,
    pub details: Vec<TransactionOutcome>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UploadRun {
    pub fn new(file_name: &str, dialect: Dialect, provider: &str, landlord_id: &str) -> Self {
        UploadRun {
            id: None,
            file_name: file_name.to_string(),
            dialect,
            provider: provider.to_string(),
            landlord_id: landlord_id.to_string(),
            content_hash: None,
            total: 0,
            matched: 0,
            unmatched: 0,
            duplicates: 0,
            errors: 0,
            details: Vec::new(),
            created_at: None,
        }
    }

    /// Counts the outcome and appends it to the detail list.
    pub fn record(&mut self, outcome: TransactionOutcome) {
        self.total += 1;
        match outcome.status {
            OutcomeStatus::Matched => self.matched += 1,
            OutcomeStatus::Unmatched => self.unmatched += 1,
            OutcomeStatus::Duplicate => self.duplicates += 1,
            OutcomeStatus::Error => self.errors += 1,
        }
        self.details.push(outcome);
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Matched invoices and the amounts paid against them, for notification hooks.
    pub fn matched_payments(&self) -> impl Iterator<Item = (&str, Money)> + '_ {
        self.details.iter().filter_map(|d| match (&d.status, &d.invoice_id) {
            (OutcomeStatus::Matched, Some(id)) => Some((id.as_str(), d.amount)),
            _ => None,
        })
    }
}
