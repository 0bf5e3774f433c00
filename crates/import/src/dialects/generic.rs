//! Fallback for statements from institutions without a dedicated parser.
//! Column roles are inferred from header cell names.

use kodi_core::{Dialect, NormalizedTransaction, RawRow};

use super::{
    build_transaction, cell, credits_only, delimiter_for, is_summary_row, log_skipped_row,
    require_rows, signed_amount, split_amount, split_fields, usable_lines, RowDraft,
    HEADER_SEARCH_LINES,
};
use crate::error::{RowParseError, StatementError};
use crate::extract::looks_like_amount;

const DIALECT: Dialect = Dialect::Generic;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ColumnRoles {
    pub date: Option<usize>,
    pub description: Option<usize>,
    pub reference: Option<usize>,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub amount: Option<usize>,
    pub balance: Option<usize>,
}

impl ColumnRoles {
    /// Assigns each header cell to the first role its name suggests. The
    /// first column claiming a role keeps it.
    pub fn from_headers(headers: &[String]) -> Self {
        let mut roles = ColumnRoles::default();
        for (idx, header) in headers.iter().enumerate() {
            let h = header.to_lowercase();
            let has = |keys: &[&str]| keys.iter().any(|k| h.contains(k));

            let slot = if has(&["date", "time"]) {
                &mut roles.date
            } else if has(&["balance"]) {
                &mut roles.balance
            } else if has(&["debit", "withdraw", "money out", "paid out"]) {
                &mut roles.debit
            } else if has(&["credit", "deposit", "paid in", "money in"]) {
                &mut roles.credit
            } else if has(&["amount", "amt"]) {
                &mut roles.amount
            } else if has(&["reference", "ref", "receipt", "cheque"]) {
                &mut roles.reference
            } else if has(&["description", "details", "narration", "narrative", "transaction", "particulars", "memo"]) {
                &mut roles.description
            } else {
                continue;
            };
            slot.get_or_insert(idx);
        }
        roles
    }

    fn has_amount_columns(&self) -> bool {
        self.debit.is_some() || self.credit.is_some() || self.amount.is_some()
    }

    fn claimed(&self, idx: usize) -> bool {
        [self.date, self.reference, self.balance, self.description]
            .contains(&Some(idx))
    }
}

/// Prefers a line naming both a date and an amount column; otherwise the
/// first line naming a date column.
fn find_header(lines: &[&str]) -> Option<(usize, u8, Vec<String>, ColumnRoles)> {
    let mut date_only = None;
    for (idx, line) in lines.iter().take(HEADER_SEARCH_LINES).enumerate() {
        let delimiter = delimiter_for(line);
        let Ok(headers) = split_fields(line, delimiter) else {
            continue;
        };
        let roles = ColumnRoles::from_headers(&headers);
        if roles.date.is_none() {
            continue;
        }
        if roles.has_amount_columns() {
            return Some((idx, delimiter, headers, roles));
        }
        date_only.get_or_insert((idx, delimiter, headers, roles));
    }
    date_only
}

pub fn parse(content: &str) -> Result<Vec<NormalizedTransaction>, StatementError> {
    let lines = usable_lines(content);
    require_rows(DIALECT, &lines)?;

    let Some((header_idx, delimiter, headers, roles)) = find_header(&lines) else {
        return Err(StatementError::format_detection());
    };
    tracing::debug!(?roles, "generic statement columns");

    let mut parsed = Vec::new();
    for (offset, line) in lines[header_idx + 1..].iter().enumerate() {
        let row = offset + 1;
        match parse_row(&roles, &headers, line, delimiter, row) {
            Ok(Some(tx)) => parsed.push(tx),
            Ok(None) => {}
            Err(e) => log_skipped_row(DIALECT, row, &e),
        }
    }

    Ok(credits_only(DIALECT, parsed))
}

fn parse_row(
    roles: &ColumnRoles,
    headers: &[String],
    line: &str,
    delimiter: u8,
    row: usize,
) -> Result<Option<NormalizedTransaction>, RowParseError> {
    let cells = split_fields(line, delimiter)?;
    if is_summary_row(&cells) {
        return Ok(None);
    }

    let amount = if roles.debit.is_some() || roles.credit.is_some() {
        split_amount(cell(&cells, roles.debit), cell(&cells, roles.credit))
    } else if roles.amount.is_some() {
        signed_amount(cell(&cells, roles.amount))
    } else {
        // Last resort: the first unclaimed cell that reads as a number.
        let found = cells
            .iter()
            .enumerate()
            .find(|(i, c)| !roles.claimed(*i) && looks_like_amount(c));
        match found {
            Some((_, c)) => signed_amount(c),
            None => return Err(RowParseError::MissingAmount),
        }
    };
    let Some(amount) = amount else {
        return Ok(None);
    };

    let draft = RowDraft {
        row,
        date: cell(&cells, roles.date),
        narrative: cell(&cells, roles.description),
        reference: roles.reference.map(|i| cell(&cells, Some(i))),
        amount,
        balance: roles.balance.map(|i| cell(&cells, Some(i))),
        raw: RawRow::from_cells(Some(headers), &cells),
    };
    build_transaction(DIALECT, draft).map(Some)
}
