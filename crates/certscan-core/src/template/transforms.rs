//! Value transforms applied after a field pattern matches, `spec.md` §4.5:
//! "a date normaliser ... and an outcome normaliser". The outcome
//! normaliser lives on [`crate::types::Outcome::normalize`]; this module is
//! just the date side, which has three input shapes to reconcile.

use once_cell::sync::Lazy;
use regex::Regex;

static DMY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").unwrap());
static YMD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})[/-](\d{1,2})[/-](\d{1,2})$").unwrap());
static MONTH_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d{1,2})(?:st|nd|rd|th)?\s+([A-Za-z]+)\s+(\d{4})$").unwrap());

const MONTH_NAMES: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Normalises a date string to `YYYY-MM-DD`, trying DD/MM/YYYY,
/// YYYY/MM/DD, and `3rd July 2024`-style month-name forms in turn.
/// Returns `None` (rather than the raw value) when nothing matches, so
/// callers can decide whether to keep the untransformed text.
pub fn normalize_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();

    if let Some(captures) = YMD_RE.captures(trimmed) {
        let year = &captures[1];
        let month: u32 = captures[2].parse().ok()?;
        let day: u32 = captures[3].parse().ok()?;
        return format_iso(year, month, day);
    }

    if let Some(captures) = DMY_RE.captures(trimmed) {
        let day: u32 = captures[1].parse().ok()?;
        let month: u32 = captures[2].parse().ok()?;
        let year = &captures[3];
        return format_iso(year, month, day);
    }

    if let Some(captures) = MONTH_NAME_RE.captures(trimmed) {
        let day: u32 = captures[1].parse().ok()?;
        let month_name = captures[2].to_lowercase();
        let month = MONTH_NAMES.iter().position(|m| *m == month_name)? as u32 + 1;
        let year = &captures[3];
        return format_iso(year, month, day);
    }

    None
}

fn format_iso(year: &str, month: u32, day: u32) -> Option<String> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(format!("{year}-{month:02}-{day:02}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dd_mm_yyyy() {
        assert_eq!(normalize_date("03/07/2024"), Some("2024-07-03".to_string()));
    }

    #[test]
    fn normalizes_yyyy_mm_dd() {
        assert_eq!(normalize_date("2024/07/03"), Some("2024-07-03".to_string()));
    }

    #[test]
    fn normalizes_month_name_form() {
        assert_eq!(normalize_date("3rd July 2024"), Some("2024-07-03".to_string()));
    }

    #[test]
    fn rejects_unrecognised_shape() {
        assert_eq!(normalize_date("not a date"), None);
    }
}
