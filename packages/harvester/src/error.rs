//! Error types for the harvester.
//!
//! Two conditions are expected and turned into control flow by callers:
//! [`HarvesterError::NoRecordsMatch`] (an empty harvest window) and, outside
//! this enum, the `Ok(false)` returned when a record limit stops a session.
//! Everything else aborts the session for that provider.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// The base URL failed the `Identify` handshake.
    #[error("{url} does not appear to be an OAI-PMH compatible base URL: {reason}")]
    NotAnOaiPmhTarget { url: String, reason: String },

    /// The filter combination legitimately matches nothing.
    #[error("the combination of from, until, set and metadataPrefix results in an empty list")]
    NoRecordsMatch,

    /// Provider answered with an OAI-PMH error other than `noRecordsMatch`.
    #[error("OAI-PMH error {code}: {message}")]
    OaiPmh { code: String, message: String },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transient failures kept happening until the retry budget ran out.
    #[error("request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Response parsed as XML but is not shaped like an OAI-PMH response.
    #[error("malformed OAI-PMH response: {0}")]
    MalformedResponse(String),

    /// Invalid date or time argument.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD (e.g., 2025-01-01)")]
    InvalidDate(String),

    /// Invalid time-of-day argument for an incremental window.
    #[error("Invalid time of day: '{0}'. Expected HH:MM (e.g., 02:00)")]
    InvalidTime(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvesterError {
    /// Whether this error means "nothing to harvest" rather than a failure.
    #[must_use]
    pub fn is_no_records_match(&self) -> bool {
        matches!(self, Self::NoRecordsMatch)
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarvesterError::InvalidDate("2025/01/01".to_string());
        assert!(err.to_string().contains("2025/01/01"));
        assert!(err.to_string().contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_not_an_oai_pmh_target_display() {
        let err = HarvesterError::NotAnOaiPmhTarget {
            url: "https://www.example.com".to_string(),
            reason: "missing Identify element".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "https://www.example.com does not appear to be an OAI-PMH compatible base URL: \
             missing Identify element"
        );
    }

    #[test]
    fn test_oai_pmh_error_display() {
        let err = HarvesterError::OaiPmh {
            code: "badResumptionToken".to_string(),
            message: "expired".to_string(),
        };
        assert_eq!(err.to_string(), "OAI-PMH error badResumptionToken: expired");
    }

    #[test]
    fn test_is_no_records_match() {
        assert!(HarvesterError::NoRecordsMatch.is_no_records_match());
        assert!(!HarvesterError::MalformedResponse("x".into()).is_no_records_match());
    }
}
