//! Bank CSV exports with a fixed, per-bank column layout.

use kodi_core::{Dialect, NormalizedTransaction, RawRow};

use super::{
    build_transaction, cell, credits_only, delimiter_for, find_column, is_summary_row,
    log_skipped_row, require_rows, signed_amount, split_amount, split_fields, usable_lines,
    RowDraft, HEADER_SEARCH_LINES,
};
use crate::error::{RowParseError, StatementError};

/// A column located by header keyword, or by position when the header does not name it.
pub struct ColumnSpec {
    pub keys: &'static [&'static str],
    pub fallback: usize,
}

impl ColumnSpec {
    fn resolve(&self, headers: Option<&[String]>) -> usize {
        headers
            .and_then(|h| find_column(h, self.keys))
            .unwrap_or(self.fallback)
    }
}

pub enum AmountSpec {
    Split { debit: ColumnSpec, credit: ColumnSpec },
    Single(ColumnSpec),
}

pub struct BankLayout {
    pub dialect: Dialect,
    pub date: ColumnSpec,
    pub narrative: ColumnSpec,
    pub reference: Option<ColumnSpec>,
    pub amount: AmountSpec,
    pub balance: Option<ColumnSpec>,
}

const DATE_KEYS: &[&str] = &["transaction date", "txn date", "posting date", "date"];
const BALANCE_KEYS: &[&str] = &["ledger balance", "running balance", "book balance", "balance"];

pub const KCB: BankLayout = BankLayout {
    dialect: Dialect::Kcb,
    date: ColumnSpec { keys: DATE_KEYS, fallback: 0 },
    narrative: ColumnSpec { keys: &["transaction details", "details", "description", "narrative"], fallback: 2 },
    reference: Some(ColumnSpec { keys: &["cheque", "reference", "ref"], fallback: 3 }),
    amount: AmountSpec::Split {
        debit: ColumnSpec { keys: &["money out", "debit", "withdraw"], fallback: 4 },
        credit: ColumnSpec { keys: &["money in", "credit", "deposit"], fallback: 5 },
    },
    balance: Some(ColumnSpec { keys: BALANCE_KEYS, fallback: 6 }),
};

pub const EQUITY: BankLayout = BankLayout {
    dialect: Dialect::Equity,
    date: ColumnSpec { keys: DATE_KEYS, fallback: 0 },
    narrative: ColumnSpec { keys: &["narrative", "description", "particulars", "details"], fallback: 2 },
    reference: Some(ColumnSpec { keys: &["transaction reference", "reference", "ref"], fallback: 3 }),
    amount: AmountSpec::Split {
        debit: ColumnSpec { keys: &["debit", "withdraw", "money out"], fallback: 4 },
        credit: ColumnSpec { keys: &["credit", "deposit", "money in"], fallback: 5 },
    },
    balance: Some(ColumnSpec { keys: BALANCE_KEYS, fallback: 6 }),
};

pub const COOP: BankLayout = BankLayout {
    dialect: Dialect::Coop,
    date: ColumnSpec { keys: DATE_KEYS, fallback: 0 },
    narrative: ColumnSpec { keys: &["narration", "narrative", "description", "details"], fallback: 1 },
    reference: Some(ColumnSpec { keys: &["reference", "ref"], fallback: 2 }),
    amount: AmountSpec::Single(ColumnSpec { keys: &["amount", "amt"], fallback: 3 }),
    balance: Some(ColumnSpec { keys: BALANCE_KEYS, fallback: 4 }),
};

pub const NCBA: BankLayout = BankLayout {
    dialect: Dialect::Ncba,
    date: ColumnSpec { keys: DATE_KEYS, fallback: 0 },
    narrative: ColumnSpec { keys: &["description", "narrative", "details", "particulars"], fallback: 1 },
    reference: Some(ColumnSpec { keys: &["reference", "ref"], fallback: 2 }),
    amount: AmountSpec::Split {
        debit: ColumnSpec { keys: &["withdrawal", "debit", "money out"], fallback: 4 },
        credit: ColumnSpec { keys: &["deposit", "credit", "money in"], fallback: 5 },
    },
    balance: Some(ColumnSpec { keys: BALANCE_KEYS, fallback: 6 }),
};

/// Column indices for one file, resolved against its header.
struct Resolved {
    date: usize,
    narrative: usize,
    reference: Option<usize>,
    amount: ResolvedAmount,
    balance: Option<usize>,
}

enum ResolvedAmount {
    Split { debit: usize, credit: usize },
    Single(usize),
}

impl BankLayout {
    fn amount_keys(&self) -> Vec<&'static str> {
        match &self.amount {
            AmountSpec::Split { debit, credit } => {
                debit.keys.iter().chain(credit.keys.iter()).copied().collect()
            }
            AmountSpec::Single(spec) => spec.keys.to_vec(),
        }
    }

    /// The header is the first line naming both a date column and an amount column.
    fn header_position(&self, lines: &[&str]) -> Option<usize> {
        let amount_keys = self.amount_keys();
        lines.iter().take(HEADER_SEARCH_LINES).position(|line| {
            let lower = line.to_lowercase();
            self.date.keys.iter().any(|k| lower.contains(k))
                && amount_keys.iter().any(|k| lower.contains(k))
        })
    }

    fn resolve(&self, headers: Option<&[String]>) -> Resolved {
        Resolved {
            date: self.date.resolve(headers),
            narrative: self.narrative.resolve(headers),
            reference: self.reference.as_ref().map(|s| s.resolve(headers)),
            amount: match &self.amount {
                AmountSpec::Split { debit, credit } => ResolvedAmount::Split {
                    debit: debit.resolve(headers),
                    credit: credit.resolve(headers),
                },
                AmountSpec::Single(spec) => ResolvedAmount::Single(spec.resolve(headers)),
            },
            balance: self.balance.as_ref().map(|s| s.resolve(headers)),
        }
    }
}

pub fn parse(
    layout: &BankLayout,
    content: &str,
) -> Result<Vec<NormalizedTransaction>, StatementError> {
    let dialect = layout.dialect;
    let lines = usable_lines(content);
    require_rows(dialect, &lines)?;

    // Lines above the header are the bank's preamble (account name, period).
    let header_idx = layout.header_position(&lines);
    let header_line = lines[header_idx.unwrap_or(0)];
    let delimiter = delimiter_for(header_line);
    let headers = header_idx.and_then(|_| split_fields(header_line, delimiter).ok());
    let columns = layout.resolve(headers.as_deref());

    let data_start = header_idx.map_or(1, |i| i + 1);
    let mut parsed = Vec::new();

    for (offset, line) in lines[data_start..].iter().enumerate() {
        let row = offset + 1;
        match parse_row(layout, &columns, headers.as_deref(), line, delimiter, row) {
            Ok(Some(tx)) => parsed.push(tx),
            Ok(None) => {}
            Err(e) => log_skipped_row(dialect, row, &e),
        }
    }

    Ok(credits_only(dialect, parsed))
}

fn parse_row(
    layout: &BankLayout,
    columns: &Resolved,
    headers: Option<&[String]>,
    line: &str,
    delimiter: u8,
    row: usize,
) -> Result<Option<NormalizedTransaction>, RowParseError> {
    let cells = split_fields(line, delimiter)?;
    if is_summary_row(&cells) {
        return Ok(None);
    }

    let amount = match columns.amount {
        ResolvedAmount::Split { debit, credit } => {
            split_amount(cell(&cells, Some(debit)), cell(&cells, Some(credit)))
        }
        ResolvedAmount::Single(idx) => signed_amount(cell(&cells, Some(idx))),
    };
    let Some(amount) = amount else {
        return Ok(None);
    };

    if cells.len() <= columns.date {
        return Err(RowParseError::MissingColumn("date"));
    }

    let draft = RowDraft {
        row,
        date: cell(&cells, Some(columns.date)),
        narrative: cell(&cells, Some(columns.narrative)),
        reference: columns.reference.map(|i| cell(&cells, Some(i))),
        amount,
        balance: columns.balance.map(|i| cell(&cells, Some(i))),
        raw: RawRow::from_cells(headers, &cells),
    };
    build_transaction(layout.dialect, draft).map(Some)
}
