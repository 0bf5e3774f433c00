//! Decides which lease and invoice an incoming payment settles.
//!
//! Strategies run from the most to the least certain signal and the first
//! hit wins: an invoice reference, the payer's phone with an exact amount,
//! the landlord's paybill or account with an exact amount, and finally the
//! payer's phone with a differing amount. Every strategy that fails leaves
//! a reason behind so an unmatched payment can be followed up by hand.

use kodi_core::{
    Lease, MatchMethod, Money, NormalizedTransaction, OutstandingInvoice, ReconciliationContext,
    ReconciliationResult,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::MatcherConfig;
use crate::extract::extract_reference_code;

/// Outcome of one strategy: a match, or why it did not apply.
type Attempt = Result<ReconciliationResult, String>;

const STRATEGY_ORDER: [MatchMethod; 4] = [
    MatchMethod::Reference,
    MatchMethod::PhoneAmount,
    MatchMethod::ChannelAmount,
    MatchMethod::PhonePartial,
];

#[derive(Debug, Clone, Default)]
pub struct ReconciliationMatcher {
    config: MatcherConfig,
}

impl ReconciliationMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self {
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Pure function of the transaction and the context snapshot.
    pub fn reconcile(
        &self,
        tx: &NormalizedTransaction,
        ctx: &ReconciliationContext,
    ) -> ReconciliationResult {
        if !tx.is_credit() {
            return ReconciliationResult::unmatched(vec![
                "debit transactions are not reconciled".to_string(),
            ]);
        }

        let phone_lease = self.phone_lease(tx, ctx);
        let mut reasons = Vec::new();

        for method in STRATEGY_ORDER {
            let attempt = match method {
                MatchMethod::Reference => self.by_reference(tx, ctx),
                MatchMethod::PhoneAmount => self.by_phone_amount(tx, ctx, &phone_lease),
                MatchMethod::ChannelAmount => self.by_channel_amount(tx, ctx),
                MatchMethod::PhonePartial => self.by_phone_partial(tx, ctx, &phone_lease),
            };
            match attempt {
                Ok(mut result) => {
                    reasons.append(&mut result.reasons);
                    if let Some(note) = unapplied_note(tx.amount, result.invoice_id.as_deref(), ctx) {
                        reasons.push(note);
                    }
                    result.reasons = reasons;
                    return result;
                }
                Err(reason) => reasons.push(format!("{method}: {reason}")),
            }
        }
        ReconciliationResult::unmatched(reasons)
    }

    // ── Strategy 1: reference ────────────────────────────────────────────────

    fn by_reference(&self, tx: &NormalizedTransaction, ctx: &ReconciliationContext) -> Attempt {
        let mut candidates = vec![tx.reference.clone()];
        if let Some(code) = extract_reference_code(&tx.narrative) {
            if !code.eq_ignore_ascii_case(&tx.reference) {
                candidates.push(code);
            }
        }

        for reference in &candidates {
            if let Some(invoice) = ctx.invoice_by_reference(reference) {
                return Ok(ReconciliationResult::matched(
                    MatchMethod::Reference,
                    self.config.reference_confidence,
                    Some(invoice.lease_id.clone()),
                    Some(invoice.id.clone()),
                    vec![format!("reference {reference} matches invoice {}", invoice.id)],
                ));
            }
        }
        Err(format!(
            "no outstanding invoice with reference {}",
            candidates.join(" or ")
        ))
    }

    // ── Strategy 2: phone + exact amount ─────────────────────────────────────

    /// The single active lease whose tenant phone is the payer's.
    fn phone_lease<'c>(
        &self,
        tx: &NormalizedTransaction,
        ctx: &'c ReconciliationContext,
    ) -> Result<&'c Lease, String> {
        let Some(phone) = tx.payer_phone.as_deref() else {
            return Err("no payer phone in narrative".to_string());
        };
        match ctx.active_leases_for_phone(phone).as_slice() {
            [] => Err(format!("no active lease for phone {phone}")),
            [lease] => Ok(*lease),
            many => Err(format!("phone {phone} maps to {} active leases", many.len())),
        }
    }

    fn by_phone_amount(
        &self,
        tx: &NormalizedTransaction,
        ctx: &ReconciliationContext,
        phone_lease: &Result<&Lease, String>,
    ) -> Attempt {
        let lease = phone_lease.as_ref().map_err(Clone::clone)?;
        let invoices = ctx.invoices_for_lease(&lease.id);

        if let Some(invoice) = invoices.iter().find(|i| i.amount_due == tx.amount) {
            return Ok(ReconciliationResult::matched(
                MatchMethod::PhoneAmount,
                self.config.phone_invoice_confidence,
                Some(lease.id.clone()),
                Some(invoice.id.clone()),
                vec![format!(
                    "payer phone belongs to lease {} and amount {} equals invoice {}",
                    lease.id, tx.amount, invoice.id
                )],
            ));
        }

        if lease.monthly_rent == tx.amount {
            return Ok(ReconciliationResult::matched(
                MatchMethod::PhoneAmount,
                self.config.phone_rent_confidence,
                Some(lease.id.clone()),
                invoices.first().map(|i| i.id.clone()),
                vec![format!(
                    "payer phone belongs to lease {} and amount {} equals monthly rent",
                    lease.id, tx.amount
                )],
            ));
        }

        Err(format!(
            "amount {} does not match expected {} for lease {}",
            tx.amount,
            expected_amount(lease, &invoices),
            lease.id
        ))
    }

    // ── Strategy 3: landlord channel + exact amount ──────────────────────────

    fn by_channel_amount(&self, tx: &NormalizedTransaction, ctx: &ReconciliationContext) -> Attempt {
        let numbers: Vec<&str> = [tx.payer_paybill.as_deref(), tx.payer_account_ref.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if numbers.is_empty() {
            return Err("no payer paybill or account reference in narrative".to_string());
        }

        let mut landlords: Vec<&str> = Vec::new();
        for number in &numbers {
            for landlord in ctx.landlords_for_channel(number) {
                if !landlords.contains(&landlord) {
                    landlords.push(landlord);
                }
            }
        }
        let landlord = match landlords.as_slice() {
            [] => return Err(format!("no registered channel for {}", numbers.join(" or "))),
            [one] => *one,
            many => {
                return Err(format!(
                    "channel {} is registered to {} landlords",
                    numbers.join(" or "),
                    many.len()
                ))
            }
        };

        let leases = ctx.active_leases_for_landlord(landlord);

        // The account reference names the unit directly.
        if let Some(account_ref) = tx.payer_account_ref.as_deref() {
            let named: Vec<&&Lease> = leases
                .iter()
                .filter(|l| {
                    l.account_ref
                        .as_deref()
                        .is_some_and(|r| r.eq_ignore_ascii_case(account_ref))
                })
                .collect();
            if let [lease] = named.as_slice() {
                if let Some(invoice) = amount_target(lease, ctx, tx.amount) {
                    return Ok(ReconciliationResult::matched(
                        MatchMethod::ChannelAmount,
                        self.config.channel_account_confidence,
                        Some(lease.id.clone()),
                        invoice.map(|i| i.id.clone()),
                        vec![format!(
                            "account reference {account_ref} names lease {} under landlord {landlord} and amount {} is expected",
                            lease.id, tx.amount
                        )],
                    ));
                }
            }
        }

        let candidates: Vec<(&Lease, Option<&OutstandingInvoice>)> = leases
            .iter()
            .filter_map(|l| amount_target(l, ctx, tx.amount).map(|inv| (*l, inv)))
            .collect();
        match candidates.as_slice() {
            [] => Err(format!(
                "no lease under landlord {landlord} expects amount {}",
                tx.amount
            )),
            [(lease, invoice)] => Ok(ReconciliationResult::matched(
                MatchMethod::ChannelAmount,
                self.config.channel_amount_confidence,
                Some(lease.id.clone()),
                invoice.map(|i| i.id.clone()),
                vec![format!(
                    "only lease {} under landlord {landlord} expects amount {}",
                    lease.id, tx.amount
                )],
            )),
            many => Err(format!(
                "{} leases under landlord {landlord} expect amount {}; ambiguous",
                many.len(),
                tx.amount
            )),
        }
    }

    // ── Strategy 4: phone with differing amount ──────────────────────────────

    fn by_phone_partial(
        &self,
        tx: &NormalizedTransaction,
        ctx: &ReconciliationContext,
        phone_lease: &Result<&Lease, String>,
    ) -> Attempt {
        let lease = phone_lease.as_ref().map_err(Clone::clone)?;
        let invoices = ctx.invoices_for_lease(&lease.id);
        let expected = expected_amount(lease, &invoices);

        let discrepancy = if tx.amount < expected {
            format!("short by {}", expected - tx.amount)
        } else {
            format!("over by {}", tx.amount - expected)
        };

        Ok(ReconciliationResult::matched(
            MatchMethod::PhonePartial,
            self.partial_confidence(tx.amount, expected),
            Some(lease.id.clone()),
            invoices.first().map(|i| i.id.clone()),
            vec![format!(
                "partial payment: amount {} against expected {} for lease {} ({discrepancy})",
                tx.amount, expected, lease.id
            )],
        ))
    }

    /// Scales linearly between the partial bounds with the share of the
    /// expected amount paid, capped at the upper bound.
    fn partial_confidence(&self, amount: Money, expected: Money) -> u8 {
        let min = self.config.partial_min_confidence;
        let max = self.config.partial_max_confidence;
        let ratio = if expected.is_positive() {
            (amount.amount() / expected.amount()).min(Decimal::ONE)
        } else {
            Decimal::ONE
        };
        let score = Decimal::from(min) + Decimal::from(max - min) * ratio;
        score
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u8()
            .unwrap_or(min)
    }
}

/// Describes the part of `amount` the matched invoice cannot absorb. The
/// surplus is not carried to later invoices.
fn unapplied_note(
    amount: Money,
    invoice_id: Option<&str>,
    ctx: &ReconciliationContext,
) -> Option<String> {
    let invoice = ctx.invoices.iter().find(|i| Some(i.id.as_str()) == invoice_id)?;
    (amount > invoice.amount_due).then(|| {
        format!(
            "overpayment: {} left unapplied after settling invoice {} ({} due)",
            amount - invoice.amount_due,
            invoice.id,
            invoice.amount_due
        )
    })
}

/// The oldest outstanding invoice's balance, or the monthly rent when nothing is owed.
fn expected_amount(lease: &Lease, invoices: &[&OutstandingInvoice]) -> Money {
    invoices
        .first()
        .map(|i| i.amount_due)
        .unwrap_or(lease.monthly_rent)
}

/// `Some(invoice)` when the lease expects exactly `amount`: the invoice
/// owing it, else the oldest invoice when the rent equals it.
fn amount_target<'c>(
    lease: &Lease,
    ctx: &'c ReconciliationContext,
    amount: Money,
) -> Option<Option<&'c OutstandingInvoice>> {
    let invoices = ctx.invoices_for_lease(&lease.id);
    if let Some(invoice) = invoices.iter().find(|i| i.amount_due == amount) {
        return Some(Some(*invoice));
    }
    (lease.monthly_rent == amount).then(|| invoices.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kodi_core::{ChannelKind, Direction, PaymentChannel, RawRow};

    fn kes(shillings: i64) -> Money {
        Money::from_cents(shillings * 100)
    }

    fn tx(amount: i64, narrative: &str) -> NormalizedTransaction {
        NormalizedTransaction {
            reference: "QAB1234567".to_string(),
            occurred_at: NaiveDate::from_ymd_opt(2026, 2, 5)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            amount: kes(amount),
            direction: Direction::Credit,
            narrative: narrative.to_string(),
            running_balance: None,
            payer_phone: None,
            payer_paybill: None,
            payer_account_ref: None,
            raw: RawRow::default(),
        }
    }

    fn with_phone(mut t: NormalizedTransaction, phone: &str) -> NormalizedTransaction {
        t.payer_phone = Some(phone.to_string());
        t
    }

    fn lease(id: &str, landlord: &str, phone: Option<&str>, account: Option<&str>, rent: i64) -> Lease {
        Lease {
            id: id.to_string(),
            landlord_id: landlord.to_string(),
            tenant_name: format!("Tenant {id}"),
            tenant_phone: phone.map(str::to_string),
            account_ref: account.map(str::to_string),
            monthly_rent: kes(rent),
            active: true,
        }
    }

    fn invoice(id: &str, lease_id: &str, due: i64, month: u32) -> OutstandingInvoice {
        OutstandingInvoice {
            id: id.to_string(),
            lease_id: lease_id.to_string(),
            amount_due: kes(due),
            due_date: NaiveDate::from_ymd_opt(2026, month, 1).unwrap(),
            external_reference: None,
        }
    }

    fn paybill(landlord: &str, number: &str) -> PaymentChannel {
        PaymentChannel {
            landlord_id: landlord.to_string(),
            kind: ChannelKind::Paybill,
            number: number.to_string(),
        }
    }

    fn matcher() -> ReconciliationMatcher {
        ReconciliationMatcher::default()
    }

    // ── reference ──

    #[test]
    fn reference_match_is_certain() {
        let mut inv = invoice("inv-1", "lease-1", 20_000, 2);
        inv.external_reference = Some("qab1234567".to_string());
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", None, None, 20_000)],
            invoices: vec![inv],
            ..Default::default()
        };
        let result = matcher().reconcile(&tx(1, "anything"), &ctx);
        assert!(result.matched);
        assert_eq!(result.method, Some(MatchMethod::Reference));
        assert_eq!(result.confidence, 100);
        assert_eq!(result.invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(result.lease_id.as_deref(), Some("lease-1"));
    }

    #[test]
    fn reference_found_in_narrative() {
        let mut inv = invoice("inv-9", "lease-1", 5_000, 2);
        inv.external_reference = Some("QZZ9999999".to_string());
        let ctx = ReconciliationContext {
            invoices: vec![inv],
            ..Default::default()
        };
        let mut t = tx(5_000, "Payment QZZ9999999 received");
        t.reference = "KCB-05022026-1".to_string();
        let result = matcher().reconcile(&t, &ctx);
        assert_eq!(result.method, Some(MatchMethod::Reference));
        assert_eq!(result.invoice_id.as_deref(), Some("inv-9"));
    }

    // ── phone + amount ──

    #[test]
    fn phone_and_invoice_amount() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![
                invoice("inv-feb", "lease-1", 20_000, 2),
                invoice("inv-jan", "lease-1", 15_000, 1),
            ],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(15_000, ""), "254712345678"), &ctx);
        assert!(result.matched);
        assert_eq!(result.method, Some(MatchMethod::PhoneAmount));
        assert_eq!(result.confidence, 95);
        assert_eq!(result.invoice_id.as_deref(), Some("inv-jan"));
        // The failed reference attempt is kept in the trail.
        assert!(result.reasons[0].starts_with("reference:"));
    }

    #[test]
    fn phone_and_rent_picks_oldest_invoice() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![
                invoice("inv-mar", "lease-1", 5_000, 3),
                invoice("inv-feb", "lease-1", 12_000, 2),
            ],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(20_000, ""), "254712345678"), &ctx);
        assert_eq!(result.method, Some(MatchMethod::PhoneAmount));
        assert_eq!(result.confidence, 90);
        assert_eq!(result.invoice_id.as_deref(), Some("inv-feb"));
    }

    #[test]
    fn shared_phone_is_not_a_match() {
        let ctx = ReconciliationContext {
            leases: vec![
                lease("a", "L1", Some("254712345678"), None, 20_000),
                lease("b", "L1", Some("254712345678"), None, 20_000),
            ],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(20_000, ""), "254712345678"), &ctx);
        assert!(!result.matched);
        assert!(result.reasons.iter().any(|r| r.contains("maps to 2 active leases")));
    }

    // ── channel + amount ──

    #[test]
    fn account_reference_names_the_lease() {
        let ctx = ReconciliationContext {
            leases: vec![
                lease("a", "L1", None, Some("B12"), 15_000),
                lease("b", "L1", None, Some("B14"), 15_000),
            ],
            channels: vec![paybill("L1", "222111")],
            invoices: vec![invoice("inv-b", "b", 15_000, 2)],
        };
        let mut t = tx(15_000, "");
        t.payer_paybill = Some("222111".to_string());
        t.payer_account_ref = Some("b14".to_string());
        let result = matcher().reconcile(&t, &ctx);
        assert_eq!(result.method, Some(MatchMethod::ChannelAmount));
        assert_eq!(result.confidence, 85);
        assert_eq!(result.lease_id.as_deref(), Some("b"));
        assert_eq!(result.invoice_id.as_deref(), Some("inv-b"));
    }

    #[test]
    fn single_amount_candidate_under_landlord() {
        let ctx = ReconciliationContext {
            leases: vec![
                lease("a", "L1", None, None, 15_000),
                lease("b", "L1", None, None, 18_000),
            ],
            channels: vec![paybill("L1", "222111")],
            invoices: vec![],
        };
        let mut t = tx(18_000, "");
        t.payer_paybill = Some("222111".to_string());
        let result = matcher().reconcile(&t, &ctx);
        assert_eq!(result.method, Some(MatchMethod::ChannelAmount));
        assert_eq!(result.confidence, 75);
        assert_eq!(result.lease_id.as_deref(), Some("b"));
        assert_eq!(result.invoice_id, None);
    }

    #[test]
    fn several_amount_candidates_stay_unmatched() {
        let ctx = ReconciliationContext {
            leases: vec![
                lease("a", "L1", None, None, 15_000),
                lease("b", "L1", None, None, 15_000),
            ],
            channels: vec![paybill("L1", "222111")],
            invoices: vec![],
        };
        let mut t = tx(15_000, "");
        t.payer_paybill = Some("222111".to_string());
        let result = matcher().reconcile(&t, &ctx);
        assert!(!result.matched);
        assert!(result.reasons.iter().any(|r| r.contains("2 leases under landlord L1")));
    }

    #[test]
    fn channel_shared_by_landlords_is_ambiguous() {
        let ctx = ReconciliationContext {
            leases: vec![lease("a", "L1", None, None, 15_000)],
            channels: vec![paybill("L1", "222111"), paybill("L2", "222111")],
            invoices: vec![],
        };
        let mut t = tx(15_000, "");
        t.payer_paybill = Some("222111".to_string());
        let result = matcher().reconcile(&t, &ctx);
        assert!(!result.matched);
        assert!(result.reasons.iter().any(|r| r.contains("registered to 2 landlords")));
    }

    // ── partial ──

    #[test]
    fn partial_payment_scenario() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![invoice("inv-1", "lease-1", 20_000, 2)],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(15_000, ""), "254712345678"), &ctx);
        assert!(result.matched);
        assert_eq!(result.method, Some(MatchMethod::PhonePartial));
        // 50 + 20 * 0.75
        assert_eq!(result.confidence, 65);
        assert!((50..=70).contains(&result.confidence));
        assert!(result
            .reasons
            .iter()
            .any(|r| r.contains("amount KES 15000.00 does not match expected KES 20000.00")));
        assert!(result.reasons.last().unwrap().contains("short by KES 5000.00"));
    }

    #[test]
    fn surplus_over_matched_invoice_is_reported() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![invoice("inv-feb", "lease-1", 15_000, 2)],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(20_000, ""), "254712345678"), &ctx);
        assert_eq!(result.method, Some(MatchMethod::PhoneAmount));
        assert_eq!(result.invoice_id.as_deref(), Some("inv-feb"));
        assert_eq!(
            result.reasons.last().map(String::as_str),
            Some("overpayment: KES 5000.00 left unapplied after settling invoice inv-feb (KES 15000.00 due)")
        );
    }

    #[test]
    fn exact_invoice_payment_has_no_surplus_note() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![invoice("inv-feb", "lease-1", 20_000, 2)],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(20_000, ""), "254712345678"), &ctx);
        assert!(result.reasons.iter().all(|r| !r.starts_with("overpayment")));
    }

    #[test]
    fn overpayment_caps_at_partial_max() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            ..Default::default()
        };
        let result = matcher().reconcile(&with_phone(tx(25_000, ""), "254712345678"), &ctx);
        assert_eq!(result.method, Some(MatchMethod::PhonePartial));
        assert_eq!(result.confidence, 70);
    }

    // ── no match ──

    #[test]
    fn unknown_payer_lists_every_strategy() {
        let ctx = ReconciliationContext::default();
        let result = matcher().reconcile(&with_phone(tx(15_000, ""), "254700000001"), &ctx);
        assert!(!result.matched);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.method, None);
        assert_eq!(result.reasons.len(), 4);
        assert!(result.reasons[1].contains("no active lease for phone 254700000001"));
    }

    #[test]
    fn debits_are_never_matched() {
        let mut t = tx(100, "");
        t.direction = Direction::Debit;
        let result = matcher().reconcile(&t, &ReconciliationContext::default());
        assert!(!result.matched);
    }

    // ── ordering ──

    #[test]
    fn stronger_signal_wins_and_outranks() {
        let config = MatcherConfig::default();
        assert!(config.reference_confidence > config.phone_invoice_confidence);
        assert!(config.phone_rent_confidence > config.channel_account_confidence);
        assert!(config.channel_amount_confidence > config.partial_max_confidence);

        // Both phone and paybill resolve; the phone strategy runs first.
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            channels: vec![paybill("L1", "222111")],
            invoices: vec![],
        };
        let mut t = with_phone(tx(20_000, ""), "254712345678");
        t.payer_paybill = Some("222111".to_string());
        let result = matcher().reconcile(&t, &ctx);
        assert_eq!(result.method, Some(MatchMethod::PhoneAmount));
    }

    #[test]
    fn reference_outranks_phone_and_amount() {
        let mut inv = invoice("inv-1", "lease-1", 20_000, 2);
        inv.external_reference = Some("QAB1234567".to_string());
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![inv],
            ..Default::default()
        };
        // Phone and amount alone would give phone_amount at 95.
        let t = with_phone(tx(20_000, ""), "254712345678");
        let result = matcher().reconcile(&t, &ctx);
        assert!(result.matched);
        assert_eq!(result.method, Some(MatchMethod::Reference));
        assert_eq!(result.confidence, 100);
        assert_eq!(result.invoice_id.as_deref(), Some("inv-1"));
        assert_eq!(result.reasons, vec!["reference QAB1234567 matches invoice inv-1".to_string()]);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let ctx = ReconciliationContext {
            leases: vec![lease("lease-1", "L1", Some("254712345678"), None, 20_000)],
            invoices: vec![invoice("inv-1", "lease-1", 20_000, 2)],
            ..Default::default()
        };
        let t = with_phone(tx(12_345, ""), "254712345678");
        let m = matcher();
        assert_eq!(m.reconcile(&t, &ctx), m.reconcile(&t, &ctx));
    }
}
