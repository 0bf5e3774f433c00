use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};
use rust_decimal::Decimal;

use crate::error::DateParseError;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_amount_noise,
    r"(?i)kshs\.?|ksh\.?|kes|\$|,|\s");
re!(re_numeric_token,
    r"(?i)^\(?[+-]?(?:kshs?\.?|kes)?\s*[+-]?[\d,]*\.?\d+\)?-?(?:\s*(?:dr|cr))?$");

// Groups 4-7 of both date patterns hold the optional time of day.
re!(re_date_numeric,
    r"(?i)^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4}|\d{2})(?:[ T,]+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]m)?)?$");
re!(re_date_month_name,
    r"(?i)^(\d{1,2})[ \-/]([a-z]{3,9})\.?[ \-/,]+(\d{4}|\d{2})(?:[ T,]+(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]m)?)?$");

re!(re_phone,
    r"(?:^|\D)(?:\+?254(\d{9})|0([17]\d{8}))(?:\D|$)");
re!(re_reference_code,
    r"\b([A-Z]{3}\d{7,10})\b");
re!(re_paybill,
    r"(?i)\b(?:pay\s*bill|till|business)(?:\s*(?:no|number))?\.?[\s:#.\-]*(\d{5,7})\b");
re!(re_account_ref,
    r"(?i)\b(?:acc(?:ount)?|a/c)(?:\s*(?:no|number))?\.?[\s:#.\-]+([a-z0-9][a-z0-9\-]{0,19})\b");

// ── Amounts ───────────────────────────────────────────────────────────────────

/// Parses a statement amount cell into a signed decimal.
///
/// Currency markers, thousands separators and whitespace are ignored.
/// Parentheses, a leading or trailing `-`, and a trailing `DR` mark a negative
/// value. Blank or unreadable input yields zero, which callers read as "no amount".
pub fn parse_amount(text: &str) -> Decimal {
    let cleaned = re_amount_noise().replace_all(text.trim(), "").to_uppercase();
    let mut s = cleaned.as_str();
    let mut negative = false;

    if let Some(rest) = s.strip_suffix("DR") {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_suffix("CR") {
        s = rest;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        negative = true;
        s = inner;
    }
    if let Some(rest) = s.strip_suffix('-') {
        negative = true;
        s = rest;
    }
    if let Some(rest) = s.strip_prefix('-') {
        negative = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    match Decimal::from_str(s) {
        Ok(value) if negative => -value,
        Ok(value) => value,
        Err(_) => Decimal::ZERO,
    }
}

/// Whether a cell reads as a bare amount (as opposed to a date, code or free text).
pub fn looks_like_amount(text: &str) -> bool {
    let t = text.trim();
    !t.is_empty() && t.chars().any(|c| c.is_ascii_digit()) && re_numeric_token().is_match(t)
}

// ── Dates ─────────────────────────────────────────────────────────────────────

/// Resolves free-form statement date text.
///
/// Tried in order: ISO 8601 (offsets normalised to UTC), day-first
/// `DD/MM/YYYY` / `DD-MM-YYYY`, month-first `MM/DD/YYYY` when the day-first
/// reading is impossible, then `DD Mon YYYY`. Two-digit years are `20YY`.
/// Any form may carry a trailing `HH:MM[:SS] [AM|PM]`.
pub fn parse_date(text: &str) -> Result<NaiveDateTime, DateParseError> {
    let s = text.trim();

    if starts_with_iso_year(s) {
        if let Some(dt) = try_date_iso(s) {
            return Ok(dt);
        }
    }
    if let Some(dt) = try_date_numeric(s) {
        return Ok(dt);
    }
    if let Some(dt) = try_date_month_name(s) {
        return Ok(dt);
    }

    Err(DateParseError(s.to_string()))
}

/// `YYYY-` prefix; keeps `05-02-26` away from the ISO formats.
fn starts_with_iso_year(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10 && b[..4].iter().all(u8::is_ascii_digit) && b[4] == b'-'
}

fn try_date_iso(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn try_date_numeric(s: &str) -> Option<NaiveDateTime> {
    let c = re_date_numeric().captures(s)?;
    let p1: u32 = c.get(1)?.as_str().parse().ok()?;
    let p2: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    let date = NaiveDate::from_ymd_opt(year, p2, p1)
        .or_else(|| NaiveDate::from_ymd_opt(year, p1, p2))?;
    Some(date.and_time(time_from_captures(&c, 4)?))
}

fn try_date_month_name(s: &str) -> Option<NaiveDateTime> {
    let c = re_date_month_name().captures(s)?;
    let day: u32 = c.get(1)?.as_str().parse().ok()?;
    let month = month_to_num(c.get(2)?.as_str())?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(date.and_time(time_from_captures(&c, 4)?))
}

/// Reads `hour, minute, second, meridiem` starting at capture group `first`.
/// A missing time is midnight; an impossible one is `None`.
fn time_from_captures(c: &Captures<'_>, first: usize) -> Option<NaiveTime> {
    let Some(hour) = c.get(first) else {
        return Some(NaiveTime::MIN);
    };
    let mut hour: u32 = hour.as_str().parse().ok()?;
    let minute: u32 = c.get(first + 1)?.as_str().parse().ok()?;
    let second: u32 = match c.get(first + 2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    if let Some(meridiem) = c.get(first + 3) {
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        if hour == 0 || hour > 12 {
            return None;
        }
        hour = match (pm, hour) {
            (false, 12) => 0,
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, h) => h,
        };
    }
    NaiveTime::from_hms_opt(hour, minute, second)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

fn month_to_num(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    match lower.get(..3)? {
        "jan" => Some(1), "feb" => Some(2), "mar" => Some(3), "apr" => Some(4),
        "may" => Some(5), "jun" => Some(6), "jul" => Some(7), "aug" => Some(8),
        "sep" => Some(9), "oct" => Some(10), "nov" => Some(11), "dec" => Some(12),
        _ => None,
    }
}

// ── Narrative signals ─────────────────────────────────────────────────────────

/// Finds a Kenyan mobile number and returns it as `254XXXXXXXXX`.
pub fn extract_phone_number(text: &str) -> Option<String> {
    let c = re_phone().captures(text)?;
    let subscriber = c.get(1).or_else(|| c.get(2))?.as_str();
    Some(format!("254{subscriber}"))
}

/// Receipt-style code: three uppercase letters then 7–10 digits.
pub fn extract_reference_code(text: &str) -> Option<String> {
    re_reference_code()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_paybill(text: &str) -> Option<String> {
    re_paybill()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn extract_account_ref(text: &str) -> Option<String> {
    re_account_ref()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_uppercase())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
