//! Statement format detection from the upload's filename and content.

use kodi_core::Dialect;

use crate::dialects::HEADER_SEARCH_LINES;
use crate::extract::parse_date;

/// Strings that identify one institution's exports.
struct Signature {
    dialect: Dialect,
    filename_keys: &'static [&'static str],
    content_keys: &'static [&'static str],
}

// Banks precede M-Pesa: bank narratives routinely mention "MPESA" for
// paybill settlements, so the mobile-money signature would shadow them.
const SIGNATURES: &[Signature] = &[
    Signature {
        dialect: Dialect::Kcb,
        filename_keys: &["kcb"],
        content_keys: &["kcb bank", "kenya commercial bank"],
    },
    Signature {
        dialect: Dialect::Equity,
        filename_keys: &["equity"],
        content_keys: &["equity bank"],
    },
    Signature {
        dialect: Dialect::Coop,
        filename_keys: &["coop", "co-op", "cooperative"],
        content_keys: &["co-operative bank", "co-op bank", "cooperative bank"],
    },
    Signature {
        dialect: Dialect::Ncba,
        filename_keys: &["ncba"],
        content_keys: &["ncba bank", "ncba"],
    },
    Signature {
        dialect: Dialect::Mpesa,
        filename_keys: &["mpesa", "m-pesa", "safaricom"],
        content_keys: &["m-pesa statement", "mpesa statement", "safaricom", "receipt no."],
    },
];

/// How the dialect was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSignal {
    Filename,
    Content,
    Fallback,
}

impl DetectionSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionSignal::Filename => "filename",
            DetectionSignal::Content => "content",
            DetectionSignal::Fallback => "fallback",
        }
    }
}

/// Classifies a statement. Filename keywords win over content signatures;
/// delimited content nobody claims falls back to [`Dialect::Generic`].
pub fn detect(content: &str, filename: &str) -> Option<Dialect> {
    detect_with_signal(content, filename).map(|(dialect, _)| dialect)
}

pub fn detect_with_signal(content: &str, filename: &str) -> Option<(Dialect, DetectionSignal)> {
    let decision = classify(content, filename);
    match decision {
        Some((dialect, signal)) => {
            tracing::debug!(%dialect, signal = signal.as_str(), filename, "statement format detected")
        }
        None => tracing::debug!(filename, "statement format not recognized"),
    }
    decision
}

fn classify(content: &str, filename: &str) -> Option<(Dialect, DetectionSignal)> {
    let name = filename.to_lowercase();
    if let Some(sig) = SIGNATURES
        .iter()
        .find(|s| s.filename_keys.iter().any(|k| name.contains(k)))
    {
        return Some((sig.dialect, DetectionSignal::Filename));
    }

    let head = preamble(content);
    if head.lines().any(is_mpesa_header) {
        return Some((Dialect::Mpesa, DetectionSignal::Content));
    }
    if let Some(sig) = SIGNATURES
        .iter()
        .find(|s| s.content_keys.iter().any(|k| head.contains(k)))
    {
        return Some((sig.dialect, DetectionSignal::Content));
    }

    if content.contains(',') || content.contains('\t') {
        return Some((Dialect::Generic, DetectionSignal::Fallback));
    }
    None
}

/// Lowercased lines above the first dated row: title block and column
/// header. Row narratives name other institutions ("Pay Bill to 247247 -
/// Equity Bank"), so brand strings are only trusted here.
fn preamble(content: &str) -> String {
    content
        .lines()
        .take(HEADER_SEARCH_LINES)
        .take_while(|line| !is_dated_row(line))
        .map(|line| line.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_dated_row(line: &str) -> bool {
    line.split([',', '\t', ';'])
        .map(|c| c.trim().trim_matches('"'))
        .any(|c| !c.is_empty() && parse_date(c).is_ok())
}

/// The M-PESA web export header: a receipt column next to money columns.
fn is_mpesa_header(line: &str) -> bool {
    line.contains("receipt no") && (line.contains("paid in") || line.contains("withdrawn"))
}
