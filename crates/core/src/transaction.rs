use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Credit => "credit",
            Direction::Debit => "debit",
        }
    }
}

/// The original cells of a statement row, keyed by header name.
///
/// Kept for audit only; nothing downstream of the parser reads individual keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, String>);

impl RawRow {
    /// Pairs cells with header names. Cells beyond the header (or all cells when
    /// there is no header) are keyed `col_{n}`.
    pub fn from_cells(headers: Option<&[String]>, cells: &[String]) -> Self {
        let map = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let key = headers
                    .and_then(|h| h.get(i))
                    .map(|h| h.trim())
                    .filter(|h| !h.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("col_{i}"));
                (key, cell.clone())
            })
            .collect();
        RawRow(map)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.0)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s).map(RawRow)
    }
}

/// One statement row after dialect parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    /// Receipt number, bank reference, or `{DIALECT}-{date digits}-{row}`.
    pub reference: String,
    pub occurred_at: NaiveDateTime,
    /// Magnitude only; always positive.
    pub amount: Money,
    pub direction: Direction,
    pub narrative: String,
    pub running_balance: Option<Money>,
    pub payer_phone: Option<String>,
    pub payer_paybill: Option<String>,
    pub payer_account_ref: Option<String>,
    pub raw: RawRow,
}

impl NormalizedTransaction {
    pub fn is_credit(&self) -> bool {
        self.direction == Direction::Credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn raw_row_keys_by_header() {
        let headers = cells(&["Date", "Narration"]);
        let row = RawRow::from_cells(Some(&headers), &cells(&["01/03/2026", "Rent", "extra"]));
        assert_eq!(row.get("Date"), Some("01/03/2026"));
        assert_eq!(row.get("Narration"), Some("Rent"));
        assert_eq!(row.get("col_2"), Some("extra"));
    }

    #[test]
    fn raw_row_without_header() {
        let row = RawRow::from_cells(None, &cells(&["a", "b"]));
        assert_eq!(row.get("col_0"), Some("a"));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn raw_row_json_round_trip() {
        let row = RawRow::from_cells(None, &cells(&["a", "b"]));
        let json = row.to_json().unwrap();
        assert_eq!(RawRow::from_json(&json).unwrap(), row);
    }
}
