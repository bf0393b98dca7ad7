//! Configuration constants and argument parsing for the harvester.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;

use crate::error::{HarvesterError, Result};

/// Metadata format requested when neither the command line nor the registry
/// names one. Every OAI-PMH provider must support it.
pub const DEFAULT_METADATA_PREFIX: &str = "oai_dc";

/// HTTP timeout in seconds.
///
/// ListRecords pages on large repositories can take a while to render
/// server-side, so this is generous.
pub const HTTP_TIMEOUT_SECS: u64 = 120;

/// Maximum number of attempts for a single OAI-PMH request.
pub const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (milliseconds).
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Upper bound on a server-requested `Retry-After` wait, in seconds.
pub const MAX_RETRY_AFTER_SECS: u64 = 300;

/// How often a paused harvest checks for cancellation (milliseconds).
pub const PAUSE_POLL_MS: u64 = 250;

/// Date pattern: YYYY-MM-DD.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

/// Time-of-day pattern: HH:MM.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid regex"));

/// Datestamp granularity supported by a provider.
///
/// Negotiated once per session from the `Identify` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// `YYYY-MM-DD`
    #[default]
    Day,
    /// `YYYY-MM-DDThh:mm:ssZ`
    Seconds,
}

impl Granularity {
    /// Parse the text of an `Identify/granularity` element.
    ///
    /// Anything other than the seconds form falls back to day granularity,
    /// which every provider is required to accept.
    #[must_use]
    pub fn from_identify(text: &str) -> Self {
        if text.trim() == "YYYY-MM-DDThh:mm:ssZ" {
            Self::Seconds
        } else {
            Self::Day
        }
    }

    /// Format a datetime as a `from`/`until` argument value.
    #[must_use]
    pub fn format(self, datetime: &DateTime<Utc>) -> String {
        match self {
            Self::Day => datetime.format("%Y-%m-%d").to_string(),
            Self::Seconds => datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        }
    }
}

/// Parse a `YYYY-MM-DD` command line date into midnight UTC.
///
/// # Examples
/// ```
/// use oaiharvest_harvester::config::parse_date;
///
/// assert!(parse_date("2025-01-01").is_ok());
/// assert!(parse_date("invalid").is_err());
/// assert!(parse_date("2025-13-01").is_err()); // Invalid month
/// ```
pub fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    if !DATE_PATTERN.is_match(date_str) {
        return Err(HarvesterError::InvalidDate(date_str.to_string()));
    }

    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| HarvesterError::InvalidDate(date_str.to_string()))?;

    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Parse an `HH:MM` time of day.
///
/// # Examples
/// ```
/// use oaiharvest_harvester::config::parse_time_of_day;
///
/// assert!(parse_time_of_day("02:00").is_ok());
/// assert!(parse_time_of_day("24:00").is_err());
/// ```
pub fn parse_time_of_day(time_str: &str) -> Result<NaiveTime> {
    if !TIME_PATTERN.is_match(time_str) {
        return Err(HarvesterError::InvalidTime(time_str.to_string()));
    }

    NaiveTime::parse_from_str(time_str, "%H:%M")
        .map_err(|_| HarvesterError::InvalidTime(time_str.to_string()))
}

/// Parse a provider datestamp, which may be date-only or a full UTC datetime.
///
/// Returns `None` if the value is in neither form.
#[must_use]
pub fn parse_datestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_valid() {
        let parsed = parse_date("2025-01-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_invalid_format() {
        assert!(parse_date("").is_err());
        assert!(parse_date("2025/01/01").is_err());
        assert!(parse_date("01-01-2025").is_err());
        assert!(parse_date("2025-1-1").is_err());
    }

    #[test]
    fn test_parse_date_invalid_date() {
        assert!(parse_date("2025-13-01").is_err()); // Invalid month
        assert!(parse_date("2025-02-30").is_err()); // Invalid day
        assert!(parse_date("2025-00-01").is_err()); // Zero month
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("02:00").unwrap(),
            NaiveTime::from_hms_opt(2, 0, 0).unwrap()
        );
        assert!(parse_time_of_day("9:30").is_err());
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn test_granularity_from_identify() {
        assert_eq!(
            Granularity::from_identify("YYYY-MM-DDThh:mm:ssZ"),
            Granularity::Seconds
        );
        assert_eq!(Granularity::from_identify("YYYY-MM-DD"), Granularity::Day);
        assert_eq!(Granularity::from_identify("garbage"), Granularity::Day);
    }

    #[test]
    fn test_granularity_format() {
        let dt = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(Granularity::Day.format(&dt), "2024-03-05");
        assert_eq!(Granularity::Seconds.format(&dt), "2024-03-05T14:07:09Z");
    }

    #[test]
    fn test_parse_datestamp() {
        assert_eq!(
            parse_datestamp("2024-03-05T14:07:09Z"),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap())
        );
        assert_eq!(
            parse_datestamp(" 2024-03-05 "),
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_datestamp("yesterday"), None);
    }
}
