//! Shared machinery for the per-institution statement parsers.
//!
//! Every parser follows the same shape: split into non-blank lines, find the
//! header, tokenize each data line, map cells to fields, resolve direction,
//! build a [`NormalizedTransaction`], and finally keep credits only. A bad
//! row is logged and skipped; it never fails the statement.

pub mod bank;
pub mod generic;
pub mod mpesa;

use kodi_core::{Dialect, Direction, Money, NormalizedTransaction, RawRow};
use rust_decimal::Decimal;

use crate::error::{RowParseError, StatementError};
use crate::extract::{
    extract_account_ref, extract_paybill, extract_phone_number, extract_reference_code,
    parse_amount, parse_date,
};

/// How far down the file a header row is searched for.
pub(crate) const HEADER_SEARCH_LINES: usize = 20;

/// Row labels that mark statement boilerplate rather than transactions.
const SUMMARY_PREFIXES: &[&str] = &[
    "opening balance",
    "closing balance",
    "balance b/f",
    "balance c/f",
    "balance brought forward",
    "balance carried forward",
    "brought forward",
    "carried forward",
    "available balance",
    "uncleared",
    "grand total",
];
const SUMMARY_EXACT: &[&str] = &["total", "totals", "total:", "totals:"];

pub(crate) fn usable_lines(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(|l| l.trim().trim_start_matches('\u{feff}'))
        .filter(|l| !l.is_empty())
        .collect()
}

/// A header plus at least one data line.
pub(crate) fn require_rows(dialect: Dialect, lines: &[&str]) -> Result<(), StatementError> {
    if lines.len() < 2 {
        return Err(StatementError::EmptyStatement {
            dialect,
            lines: lines.len(),
        });
    }
    Ok(())
}

pub(crate) fn delimiter_for(header_line: &str) -> u8 {
    if header_line.contains('\t') && !header_line.contains(',') {
        b'\t'
    } else {
        b','
    }
}

/// Splits one line into trimmed cells, honouring quoted fields that contain the delimiter.
pub(crate) fn split_fields(line: &str, delimiter: u8) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record.iter().map(|f| f.trim().to_string()).collect())
}

pub(crate) fn is_summary_row(cells: &[String]) -> bool {
    cells.iter().any(|c| {
        let lower = c.trim().to_lowercase();
        SUMMARY_EXACT.contains(&lower.as_str())
            || SUMMARY_PREFIXES.iter().any(|p| lower.starts_with(p))
    })
}

/// First header whose lowercased text contains a key, trying keys in priority order.
pub(crate) fn find_column(headers: &[String], keys: &[&str]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    keys.iter()
        .find_map(|key| lowered.iter().position(|h| h.contains(key)))
}

pub(crate) fn cell(cells: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| cells.get(i)).map(String::as_str).unwrap_or("")
}

/// `{DIALECT}-{digits of the date cell}-{row}` for rows without a usable reference.
pub(crate) fn synthesize_reference(dialect: Dialect, raw_date: &str, row: usize) -> String {
    let digits: String = raw_date.chars().filter(char::is_ascii_digit).collect();
    format!("{}-{}-{}", dialect.as_str().to_uppercase(), digits, row)
}

/// Resolves separate debit and credit cells. The non-zero side wins; a row
/// where both are zero (or blank) carries no amount.
pub(crate) fn split_amount(debit: &str, credit: &str) -> Option<(Money, Direction)> {
    let debit = parse_amount(debit).abs();
    let credit = parse_amount(credit).abs();
    if credit > Decimal::ZERO {
        Some((Money::from_decimal(credit), Direction::Credit))
    } else if debit > Decimal::ZERO {
        Some((Money::from_decimal(debit), Direction::Debit))
    } else {
        None
    }
}

/// Resolves a single signed amount cell: negative or parenthesised is a debit.
pub(crate) fn signed_amount(text: &str) -> Option<(Money, Direction)> {
    let value = parse_amount(text);
    if value.is_zero() {
        return None;
    }
    let direction = if value < Decimal::ZERO {
        Direction::Debit
    } else {
        Direction::Credit
    };
    Some((Money::from_decimal(value.abs()), direction))
}

/// Field values picked out of one data row by a dialect parser.
pub(crate) struct RowDraft<'a> {
    /// 1-based position among the lines following the header.
    pub row: usize,
    pub date: &'a str,
    pub narrative: &'a str,
    pub reference: Option<&'a str>,
    pub amount: (Money, Direction),
    pub balance: Option<&'a str>,
    pub raw: RawRow,
}

pub(crate) fn build_transaction(
    dialect: Dialect,
    draft: RowDraft<'_>,
) -> Result<NormalizedTransaction, RowParseError> {
    let occurred_at = parse_date(draft.date)?;
    let (amount, direction) = draft.amount;
    let narrative = draft.narrative.trim().to_string();

    let reference = draft
        .reference
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .or_else(|| extract_reference_code(&narrative))
        .unwrap_or_else(|| synthesize_reference(dialect, draft.date, draft.row));

    let running_balance = draft
        .balance
        .filter(|b| !b.trim().is_empty())
        .map(|b| Money::from_decimal(parse_amount(b)));

    Ok(NormalizedTransaction {
        reference,
        occurred_at,
        amount,
        direction,
        payer_phone: extract_phone_number(&narrative),
        payer_paybill: extract_paybill(&narrative),
        payer_account_ref: extract_account_ref(&narrative),
        narrative,
        running_balance,
        raw: draft.raw,
    })
}

pub(crate) fn log_skipped_row(dialect: Dialect, row: usize, error: &RowParseError) {
    tracing::warn!(dialect = %dialect, row, error = %error, "skipping statement row");
}

/// Drops debits; only incoming funds are reconciled.
pub(crate) fn credits_only(
    dialect: Dialect,
    parsed: Vec<NormalizedTransaction>,
) -> Vec<NormalizedTransaction> {
    let total = parsed.len();
    let credits: Vec<NormalizedTransaction> = parsed.into_iter().filter(|t| t.is_credit()).collect();
    tracing::debug!(
        dialect = %dialect,
        credits = credits.len(),
        debits = total - credits.len(),
        "statement parsed"
    );
    credits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn split_fields_respects_quotes() {
        let fields = split_fields(r#""01/03/2026","Deposit, John",,"5,000.00""#, b',').unwrap();
        assert_eq!(fields, cells(&["01/03/2026", "Deposit, John", "", "5,000.00"]));
    }

    #[test]
    fn split_fields_tab_delimited() {
        let fields = split_fields("01/03/2026\tRent\t5000", b'\t').unwrap();
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn usable_lines_drops_blanks_and_bom() {
        let lines = usable_lines("\u{feff}Date,Amount\n\n   \n01/03/2026,5\n");
        assert_eq!(lines, vec!["Date,Amount", "01/03/2026,5"]);
    }

    #[test]
    fn summary_rows_detected() {
        assert!(is_summary_row(&cells(&["", "Opening Balance", "", "10,000.00"])));
        assert!(is_summary_row(&cells(&["TOTAL", "", "5,000.00"])));
        assert!(!is_summary_row(&cells(&["01/03/2026", "TOTAL ENERGIES KAREN", "500.00"])));
    }

    #[test]
    fn find_column_prefers_key_order() {
        let headers = cells(&["Value Date", "Transaction Date", "Details"]);
        assert_eq!(find_column(&headers, &["transaction date", "date"]), Some(1));
        assert_eq!(find_column(&headers, &["balance"]), None);
    }

    #[test]
    fn synthesized_reference_format() {
        assert_eq!(synthesize_reference(Dialect::Generic, "01/03/2026", 1), "GENERIC-01032026-1");
    }

    #[test]
    fn split_amount_resolution() {
        assert_eq!(split_amount("", "5,000.00"), Some((Money::from_cents(500_000), Direction::Credit)));
        assert_eq!(split_amount("250.00", ""), Some((Money::from_cents(25_000), Direction::Debit)));
        assert_eq!(split_amount("0.00", ""), None);
        assert_eq!(split_amount("", ""), None);
    }

    #[test]
    fn signed_amount_resolution() {
        assert_eq!(signed_amount("(300.00)"), Some((Money::from_cents(30_000), Direction::Debit)));
        assert_eq!(signed_amount("300"), Some((Money::from_cents(30_000), Direction::Credit)));
        assert_eq!(signed_amount("0"), None);
    }

    #[test]
    fn build_transaction_synthesizes_reference_and_extracts_signals() {
        let draft = RowDraft {
            row: 3,
            date: "05/02/2026",
            narrative: "MPESA PAYBILL 222111 ACC B12 254712345678",
            reference: Some("  "),
            amount: (Money::from_cents(100), Direction::Credit),
            balance: Some("1,000.00"),
            raw: RawRow::default(),
        };
        let tx = build_transaction(Dialect::Kcb, draft).unwrap();
        assert_eq!(tx.reference, "KCB-05022026-3");
        assert_eq!(tx.payer_phone.as_deref(), Some("254712345678"));
        assert_eq!(tx.payer_paybill.as_deref(), Some("222111"));
        assert_eq!(tx.payer_account_ref.as_deref(), Some("B12"));
        assert_eq!(tx.running_balance, Some(Money::from_cents(100_000)));
    }

    #[test]
    fn build_transaction_rejects_bad_date() {
        let draft = RowDraft {
            row: 1,
            date: "yesterday",
            narrative: "",
            reference: None,
            amount: (Money::from_cents(100), Direction::Credit),
            balance: None,
            raw: RawRow::default(),
        };
        assert!(matches!(
            build_transaction(Dialect::Generic, draft),
            Err(RowParseError::InvalidDate(_))
        ));
    }
}
