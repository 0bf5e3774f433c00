//! Single entry point from raw statement text to normalized credits.

use kodi_core::{Dialect, NormalizedTransaction};

use crate::detect::detect;
use crate::dialects::{bank, generic, mpesa};
use crate::error::StatementError;

/// A statement's transactions together with the dialect used to read them.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub dialect: Dialect,
    pub transactions: Vec<NormalizedTransaction>,
}

/// Dispatches to the parser for `dialect`.
pub fn parse_with_dialect(
    content: &str,
    dialect: Dialect,
) -> Result<Vec<NormalizedTransaction>, StatementError> {
    match dialect {
        Dialect::Mpesa => mpesa::parse(content),
        Dialect::Kcb => bank::parse(&bank::KCB, content),
        Dialect::Equity => bank::parse(&bank::EQUITY, content),
        Dialect::Coop => bank::parse(&bank::COOP, content),
        Dialect::Ncba => bank::parse(&bank::NCBA, content),
        Dialect::Generic => generic::parse(content),
    }
}

/// Resolves the dialect (an explicit `declared` value beats detection) and parses.
pub fn parse_statement(
    content: &str,
    filename: &str,
    declared: Option<&str>,
) -> Result<ParsedStatement, StatementError> {
    let dialect = match declared {
        Some(name) => name.parse::<Dialect>()?,
        None => detect(content, filename).ok_or_else(StatementError::format_detection)?,
    };

    let transactions = parse_with_dialect(content, dialect)?;
    tracing::info!(%dialect, filename, credits = transactions.len(), "statement parsed");
    Ok(ParsedStatement { dialect, transactions })
}
