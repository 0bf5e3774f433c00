//! Read-only snapshot of the landlord's books, as seen by the matcher.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub id: String,
    pub landlord_id: String,
    pub tenant_name: String,
    /// Canonical `254XXXXXXXXX` form.
    pub tenant_phone: Option<String>,
    /// Account reference tenants quote when paying via paybill (usually the unit code).
    pub account_ref: Option<String>,
    pub monthly_rent: Money,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Paybill,
    Till,
    BankAccount,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Paybill => "paybill",
            ChannelKind::Till => "till",
            ChannelKind::BankAccount => "bank_account",
        }
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "paybill" => Ok(ChannelKind::Paybill),
            "till" => Ok(ChannelKind::Till),
            "bank_account" => Ok(ChannelKind::BankAccount),
            other => Err(format!("Unknown channel kind: '{other}'")),
        }
    }
}

/// A paybill, till or bank account registered to a landlord.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentChannel {
    pub landlord_id: String,
    pub kind: ChannelKind,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingInvoice {
    pub id: String,
    pub lease_id: String,
    pub amount_due: Money,
    pub due_date: NaiveDate,
    pub external_reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconciliationContext {
    pub leases: Vec<Lease>,
    pub channels: Vec<PaymentChannel>,
    pub invoices: Vec<OutstandingInvoice>,
}

impl ReconciliationContext {
    pub fn active_leases_for_phone(&self, phone: &str) -> Vec<&Lease> {
        self.leases
            .iter()
            .filter(|l| l.active && l.tenant_phone.as_deref() == Some(phone))
            .collect()
    }

    pub fn active_leases_for_landlord(&self, landlord_id: &str) -> Vec<&Lease> {
        self.leases
            .iter()
            .filter(|l| l.active && l.landlord_id == landlord_id)
            .collect()
    }

    /// Outstanding invoices for a lease, oldest due date first.
    pub fn invoices_for_lease(&self, lease_id: &str) -> Vec<&OutstandingInvoice> {
        let mut invoices: Vec<&OutstandingInvoice> = self
            .invoices
            .iter()
            .filter(|i| i.lease_id == lease_id)
            .collect();
        invoices.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        invoices
    }

    /// Distinct landlords owning a channel with this number, in first-seen order.
    pub fn landlords_for_channel(&self, number: &str) -> Vec<&str> {
        let mut landlords: Vec<&str> = Vec::new();
        for channel in self.channels.iter().filter(|c| c.number == number) {
            if !landlords.contains(&channel.landlord_id.as_str()) {
                landlords.push(channel.landlord_id.as_str());
            }
        }
        landlords
    }

    pub fn invoice_by_reference(&self, reference: &str) -> Option<&OutstandingInvoice> {
        self.invoices.iter().find(|i| {
            i.external_reference
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case(reference))
        })
    }
}
