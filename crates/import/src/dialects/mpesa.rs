//! M-PESA statements, in either the web-portal or the app export layout.

use kodi_core::{Dialect, NormalizedTransaction, RawRow};

use super::{
    build_transaction, cell, credits_only, delimiter_for, find_column, is_summary_row,
    log_skipped_row, require_rows, signed_amount, split_amount, split_fields, usable_lines,
    RowDraft, HEADER_SEARCH_LINES,
};
use crate::error::{RowParseError, StatementError};
use crate::extract::{extract_reference_code, looks_like_amount, parse_date};

const DIALECT: Dialect = Dialect::Mpesa;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Web portal export: has a receipt-number column and a status column.
    Web,
    /// Mobile app export: no receipt column; the code lives in the details text.
    App,
    /// No recognizable header; rows are scanned cell by cell.
    Scan,
}

struct Columns {
    receipt: Option<usize>,
    date: usize,
    status: Option<usize>,
    details: usize,
    paid_in: usize,
    withdrawn: usize,
    balance: Option<usize>,
}

impl Columns {
    /// Web layout: receipt, completion time, status, details, withdrawn, paid in, balance.
    /// Optional columns are taken from the header only; exports vary in which they carry.
    fn web(headers: &[String]) -> Self {
        Columns {
            receipt: find_column(headers, &["receipt"]),
            date: find_column(headers, &["completion", "date", "time"]).unwrap_or(1),
            status: find_column(headers, &["status"]),
            details: find_column(headers, &["details", "description"]).unwrap_or(3),
            withdrawn: find_column(headers, &["withdrawn", "withdrawal", "paid out", "money out"])
                .unwrap_or(4),
            paid_in: find_column(headers, &["paid in", "money in", "deposit"]).unwrap_or(5),
            balance: find_column(headers, &["balance"]),
        }
    }

    /// App layout: date, details, paid in, withdrawn, balance.
    fn app(headers: &[String]) -> Self {
        Columns {
            receipt: None,
            date: find_column(headers, &["date", "time"]).unwrap_or(0),
            status: find_column(headers, &["status"]),
            details: find_column(headers, &["details", "description", "narrative"]).unwrap_or(1),
            paid_in: find_column(headers, &["paid in", "money in"]).unwrap_or(2),
            withdrawn: find_column(headers, &["withdrawn", "paid out", "money out"]).unwrap_or(3),
            balance: find_column(headers, &["balance"]),
        }
    }
}

/// Picks the layout from the first header-looking line.
pub fn detect_layout(lines: &[&str]) -> (Layout, Option<usize>) {
    for (idx, line) in lines.iter().take(HEADER_SEARCH_LINES).enumerate() {
        let lower = line.to_lowercase();
        if lower.contains("receipt") {
            return (Layout::Web, Some(idx));
        }
        if lower.contains("paid in") || lower.contains("money in") {
            return (Layout::App, Some(idx));
        }
    }
    (Layout::Scan, None)
}

pub fn parse(content: &str) -> Result<Vec<NormalizedTransaction>, StatementError> {
    let lines = usable_lines(content);
    require_rows(DIALECT, &lines)?;

    let (layout, header_idx) = detect_layout(&lines);
    tracing::debug!(?layout, "m-pesa statement layout");

    let parsed = match (layout, header_idx) {
        (Layout::Web | Layout::App, Some(idx)) => parse_with_header(layout, &lines, idx),
        _ => parse_by_scan(&lines),
    };

    Ok(credits_only(DIALECT, parsed))
}

fn parse_with_header(layout: Layout, lines: &[&str], header_idx: usize) -> Vec<NormalizedTransaction> {
    let delimiter = delimiter_for(lines[header_idx]);
    let headers = split_fields(lines[header_idx], delimiter).unwrap_or_default();
    let columns = match layout {
        Layout::Web => Columns::web(&headers),
        _ => Columns::app(&headers),
    };

    let mut parsed = Vec::new();
    for (offset, line) in lines[header_idx + 1..].iter().enumerate() {
        let row = offset + 1;
        match parse_row(&columns, &headers, line, delimiter, row) {
            Ok(Some(tx)) => parsed.push(tx),
            Ok(None) => {}
            Err(e) => log_skipped_row(DIALECT, row, &e),
        }
    }
    parsed
}

fn parse_row(
    columns: &Columns,
    headers: &[String],
    line: &str,
    delimiter: u8,
    row: usize,
) -> Result<Option<NormalizedTransaction>, RowParseError> {
    let cells = split_fields(line, delimiter)?;
    if is_summary_row(&cells) {
        return Ok(None);
    }

    // Failed and reversed transfers appear in the export but moved no money.
    let status = cell(&cells, columns.status);
    if !status.is_empty() && !status.eq_ignore_ascii_case("completed") {
        tracing::debug!(row, status, "skipping non-completed m-pesa row");
        return Ok(None);
    }

    let Some(amount) = split_amount(
        cell(&cells, Some(columns.withdrawn)),
        cell(&cells, Some(columns.paid_in)),
    ) else {
        return Ok(None);
    };

    let details = cell(&cells, Some(columns.details));
    let draft = RowDraft {
        row,
        date: cell(&cells, Some(columns.date)),
        narrative: details,
        reference: columns.receipt.map(|i| cell(&cells, Some(i))),
        amount,
        balance: columns.balance.map(|i| cell(&cells, Some(i))),
        raw: RawRow::from_cells(Some(headers), &cells),
    };
    build_transaction(DIALECT, draft).map(Some)
}

/// Best-effort pass for headerless or unfamiliar exports: each cell is
/// classified as a date, a receipt code, an amount or free text.
fn parse_by_scan(lines: &[&str]) -> Vec<NormalizedTransaction> {
    let delimiter = delimiter_for(lines[0]);
    let mut parsed = Vec::new();

    for (offset, line) in lines.iter().enumerate() {
        let row = offset + 1;
        match scan_row(line, delimiter, row) {
            Ok(Some(tx)) => parsed.push(tx),
            Ok(None) => {}
            Err(e) => log_skipped_row(DIALECT, row, &e),
        }
    }
    parsed
}

fn scan_row(
    line: &str,
    delimiter: u8,
    row: usize,
) -> Result<Option<NormalizedTransaction>, RowParseError> {
    let cells = split_fields(line, delimiter)?;
    if is_summary_row(&cells) {
        return Ok(None);
    }

    let date_idx = cells.iter().position(|c| parse_date(c).is_ok());
    let code_idx = cells
        .iter()
        .position(|c| extract_reference_code(c).as_deref() == Some(c.as_str()));
    let amount = cells
        .iter()
        .enumerate()
        .filter(|(i, c)| Some(*i) != date_idx && Some(*i) != code_idx && looks_like_amount(c))
        .find_map(|(_, c)| signed_amount(c));
    let narrative = cells
        .iter()
        .enumerate()
        .filter(|(i, c)| Some(*i) != date_idx && Some(*i) != code_idx && !looks_like_amount(c))
        .map(|(_, c)| c.as_str())
        .max_by_key(|c| c.len())
        .unwrap_or("");

    let Some(date_idx) = date_idx else {
        return Err(RowParseError::MissingColumn("date"));
    };
    let Some(amount) = amount else {
        return Err(RowParseError::MissingAmount);
    };

    let draft = RowDraft {
        row,
        date: &cells[date_idx],
        narrative,
        reference: code_idx.map(|i| cells[i].as_str()),
        amount,
        balance: None,
        raw: RawRow::from_cells(None, &cells),
    };
    build_transaction(DIALECT, draft).map(Some)
}
