//! Date text normalization.
//!
//! The portal prints match dates in several shapes depending on page and
//! locale. Everything is reduced to a calendar date or `None`; the raw text is
//! not kept.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Explicit formats, tried in order before the regex fallbacks
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d %B %Y", "%d %b %Y"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M"];

/// Swedish month names as printed on the portal
const MONTHS: [&str; 12] = [
    "januari",
    "februari",
    "mars",
    "april",
    "maj",
    "juni",
    "juli",
    "augusti",
    "september",
    "oktober",
    "november",
    "december",
];

/// Shapes the explicit formats may see; chrono's `%Y` alone would take any year width
static EXPLICIT_SHAPE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(?:\d{4}-\d{1,2}-\d{1,2}(?: \d{1,2}:\d{2})?|\d{1,2}[-/]\d{1,2}[-/]\d{4}|\d{1,2} [A-Za-z]+ \d{4})$",
    )
    .ok()
});

static NUMERIC_TRIPLE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").ok());

static DAY_MONTH_NAME_YEAR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s+([A-Za-zåäöÅÄÖ]+)\s+(\d{4})\b").ok());

/// Remove the "Matchdatum:" label and the "kl" clock marker, collapse whitespace
fn strip_noise(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_label = trimmed
        .get(.."matchdatum:".len())
        .filter(|head| head.eq_ignore_ascii_case("matchdatum:"))
        .map_or(trimmed, |head| &trimmed[head.len()..]);

    without_label
        .split_whitespace()
        .filter(|token| !token.eq_ignore_ascii_case("kl") && !token.eq_ignore_ascii_case("kl."))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_explicit(text: &str) -> Option<NaiveDate> {
    if !EXPLICIT_SHAPE.as_ref().is_some_and(|shape| shape.is_match(text)) {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

fn parse_numeric_triple(text: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_TRIPLE.as_ref()?.captures(text)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let day = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_name(text: &str) -> Option<NaiveDate> {
    let caps = DAY_MONTH_NAME_YEAR.as_ref()?.captures(text)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let name = caps.get(2)?.as_str().to_lowercase();
    let year = caps.get(3)?.as_str().parse().ok()?;
    let month = MONTHS.iter().position(|m| *m == name)?;
    NaiveDate::from_ymd_opt(year, u32::try_from(month + 1).ok()?, day)
}

/// Parse any known date shape; `None` when nothing matches or the date does not exist
pub fn normalize(raw: Option<&str>) -> Option<NaiveDate> {
    let text = strip_noise(raw?);
    if text.is_empty() {
        return None;
    }

    parse_explicit(&text)
        .or_else(|| parse_numeric_triple(&text))
        .or_else(|| parse_month_name(&text))
}

/// [`normalize`] rendered as canonical `YYYY-MM-DD`
pub fn normalize_to_iso(raw: Option<&str>) -> Option<String> {
    normalize(raw).map(|date| date.format("%Y-%m-%d").to_string())
}
