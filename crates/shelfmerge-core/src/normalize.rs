//! Total field normalizers. Every function maps malformed input to `None`
//! and never fails.

use chrono::{DateTime, Datelike, NaiveDate};

use crate::models::{Isbn, PubDate};

const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    ("eng", "en"),
    ("en-US", "en"),
    ("en_US", "en"),
    ("english", "en"),
    ("spa", "es"),
    ("es-ES", "es"),
    ("spanish", "es"),
    ("fr", "fr"),
    ("fra", "fr"),
    ("fre", "fr"),
];

const CURRENCY_ALIASES: &[(&str, &str)] = &[
    ("USD", "USD"),
    ("US$", "USD"),
    ("$", "USD"),
    ("EUR", "EUR"),
    ("€", "EUR"),
    ("GBP", "GBP"),
    ("£", "GBP"),
];

// Month-first before day-first, matching the usual US listing format.
const FULL_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Trims text; blank input is absent.
pub fn clean_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

pub fn normalize_isbn(raw: &str) -> Option<Isbn> {
    Isbn::normalize(raw)
}

/// Parses a publication date without ever upgrading its precision.
pub fn normalize_pub_date(raw: &str) -> Option<PubDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok().map(PubDate::Year);
    }
    if let Some(date) = parse_year_month(s) {
        return Some(date);
    }

    // Fuzzy pass: the earliest, widest window of tokens that reads as a date.
    let tokens: Vec<&str> = s.split_whitespace().collect();
    for start in 0..tokens.len() {
        for end in (start + 1..=tokens.len()).rev() {
            let candidate = tokens[start..end].join(" ");
            if let Some(date) = parse_calendar(&candidate) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_year_month(s: &str) -> Option<PubDate> {
    if s.len() != 7 || s.as_bytes()[4] != b'-' {
        return None;
    }
    let (year, month) = (s.get(..4)?, s.get(5..)?);
    if !year.chars().all(|c| c.is_ascii_digit()) || !month.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let month: u32 = month.parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }
    Some(PubDate::YearMonth(year.parse().ok()?, month))
}

fn parse_calendar(candidate: &str) -> Option<PubDate> {
    // "April 2019" carries no day and stays year-month.
    if let Some(date) = parse_month_year(candidate) {
        return Some(date);
    }

    for format in FULL_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(candidate, format)
            && fields_match_tokens(candidate, format, date)
        {
            return Some(PubDate::Full(date));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(PubDate::Full(dt.date_naive()));
    }
    if let Some(prefix) = candidate.get(..10)
        && matches!(candidate[10..].chars().next(), Some('T') | Some(' '))
        && let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        && fields_match_tokens(prefix, "%Y-%m-%d", date)
    {
        return Some(PubDate::Full(date));
    }
    None
}

fn parse_month_year(candidate: &str) -> Option<PubDate> {
    let mut parts = candidate.split_whitespace();
    let (Some(month), Some(year), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    let month = month_from_name(month)?;
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(PubDate::YearMonth(year.parse().ok()?, month))
}

/// chrono lets `%d` and `%Y` stop inside a digit run and treats a format
/// space as optional, so "April 2019" would read as day 20 of year 19.
/// Every digit run must be exactly one numeric field, and the year four digits.
fn fields_match_tokens(text: &str, format: &str, date: NaiveDate) -> bool {
    let runs: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .collect();
    let fields: Vec<(i64, usize)> = format
        .split('%')
        .skip(1)
        .filter_map(|field| match field.chars().next() {
            Some('Y') => Some((i64::from(date.year()), 4)),
            Some('m') => Some((i64::from(date.month()), 2)),
            Some('d') => Some((i64::from(date.day()), 2)),
            _ => None,
        })
        .collect();

    runs.len() == fields.len()
        && runs.iter().zip(&fields).all(|(run, (value, width))| {
            let width_ok = if *width == 4 {
                run.len() == 4
            } else {
                run.len() <= *width
            };
            width_ok && run.parse::<i64>().ok() == Some(*value)
        })
}

fn month_from_name(token: &str) -> Option<u32> {
    let token = token.trim_end_matches(['.', ',']).to_lowercase();
    if token.chars().count() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(&token))
        .map(|idx| idx as u32 + 1)
}

/// Alias lookup, then the first two characters lowercased.
pub fn normalize_language(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let lowered = s.to_lowercase();
    if let Some((_, code)) = LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| alias.to_lowercase() == lowered)
    {
        return Some((*code).to_string());
    }
    if s.chars().count() >= 2 {
        return Some(s.chars().take(2).collect::<String>().to_lowercase());
    }
    Some(s.to_string())
}

/// Alias lookup to ISO-4217, else the input uppercased.
pub fn normalize_currency(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    CURRENCY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == s)
        .map(|(_, code)| (*code).to_string())
        .or_else(|| Some(s.to_uppercase()))
}

/// Integer parse; integral floats such as `"1520.0"` are accepted.
pub fn coerce_int(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(value) = s.parse::<i64>() {
        return Some(value);
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64)
}

pub fn coerce_float(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
