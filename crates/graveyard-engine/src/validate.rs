//! Input checks shared by the engines

use chrono::NaiveDate;
use graveyard_core::{Error, Result};

/// Trimmed, non-blank text no longer than `max` characters.
pub(crate) fn required_text(field: &str, value: Option<&str>, max: usize) -> Result<String> {
    let text = value.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(Error::validation(format!("{} is required", field)));
    }
    bounded(field, text, max)?;
    Ok(text.to_string())
}

pub(crate) fn bounded(field: &str, text: &str, max: usize) -> Result<()> {
    let len = text.chars().count();
    if len > max {
        return Err(Error::validation(format!(
            "{} is too long ({} > {} characters)",
            field, len, max
        )));
    }
    Ok(())
}

/// Optional http(s) link. Blank input means "no link".
pub(crate) fn link(field: &str, value: Option<&str>) -> Result<Option<String>> {
    let Some(raw) = value.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let lower = raw.to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !raw.contains(char::is_whitespace) => {
            Ok(Some(raw.to_string()))
        }
        _ => Err(Error::validation(format!(
            "{} must be an http(s) URL: {}",
            field, raw
        ))),
    }
}

pub(crate) fn date_order(started_on: NaiveDate, abandoned_on: Option<NaiveDate>) -> Result<()> {
    match abandoned_on {
        Some(abandoned) if abandoned < started_on => Err(Error::validation(format!(
            "abandoned date {} is before start date {}",
            abandoned, started_on
        ))),
        _ => Ok(()),
    }
}

/// One `@`, something on both sides, a dot in the domain.
pub(crate) fn email(value: &str) -> Result<()> {
    let value = value.trim();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::validation(format!("invalid email: {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("title", Some("  hi "), 10).unwrap(), "hi");
        assert!(required_text("title", Some("   "), 10).is_err());
        assert!(required_text("title", None, 10).is_err());
        assert!(required_text("title", Some("abcdef"), 3).is_err());
    }

    #[test]
    fn links() {
        assert_eq!(link("link", Some("http://new")).unwrap().as_deref(), Some("http://new"));
        assert_eq!(link("link", Some(" https://x.io/a ")).unwrap().as_deref(), Some("https://x.io/a"));
        assert_eq!(link("link", Some("")).unwrap(), None);
        assert_eq!(link("link", None).unwrap(), None);
        assert!(link("link", Some("ftp://x")).is_err());
        assert!(link("link", Some("https://")).is_err());
        assert!(link("link", Some("http://a b")).is_err());
    }

    #[test]
    fn dates() {
        let start = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        assert!(date_order(start, None).is_ok());
        assert!(date_order(start, Some(start)).is_ok());
        assert!(date_order(start, start.pred_opt()).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("a@b.co").is_ok());
        assert!(email("a@b").is_err());
        assert!(email("@b.co").is_err());
        assert!(email("a@@b.co").is_err());
        assert!(email("no-at-sign").is_err());
    }
}
