//! HTTP client wrapper for talking to OAI-PMH providers.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;

use crate::config::{HTTP_TIMEOUT_SECS, MAX_RETRIES, MAX_RETRY_AFTER_SECS, RETRY_BASE_DELAY_MS};
use crate::error::{HarvesterError, Result};

/// User agent string identifying this harvester.
const USER_AGENT: &str = concat!("oaiharvest/", env!("CARGO_PKG_VERSION"));

/// Create a configured HTTP client.
///
/// # Returns
/// A `reqwest::blocking::Client` configured with appropriate timeout and user agent.
pub fn create_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Issue a GET request with query parameters and return the decoded body.
///
/// Transient failures (connection errors, timeouts, 5xx responses) are
/// retried with exponential backoff. A `503 Service Unavailable` carrying a
/// `Retry-After` header in seconds waits for that long instead, which is how
/// OAI-PMH providers ask harvesters to slow down.
pub fn get_text(client: &Client, url: &str, query: &[(&str, String)]) -> Result<String> {
    let mut last_error: Option<String> = None;
    let mut delay: Option<Duration> = None;

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            // Exponential backoff: 500ms, 1000ms, 2000ms, ...
            let wait = delay
                .take()
                .unwrap_or_else(|| Duration::from_millis(RETRY_BASE_DELAY_MS * (1 << (attempt - 1))));
            tracing::debug!(attempt, delay_ms = wait.as_millis() as u64, "Retrying after delay");
            thread::sleep(wait);
        }

        match client.get(url).query(query).send() {
            Ok(response) => {
                let status = response.status();

                if status.is_server_error() {
                    tracing::warn!(
                        status = %status,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Server error, will retry"
                    );
                    if status == StatusCode::SERVICE_UNAVAILABLE {
                        delay = retry_after(&response);
                    }
                    last_error = Some(format!("Server error: {status}"));
                    continue;
                }

                // Don't retry client errors (4xx) - they won't succeed
                let response = response.error_for_status()?;
                let bytes = response.bytes()?;
                return Ok(bytes_to_string(&bytes, url));
            }
            Err(e) => {
                if e.is_connect() || e.is_timeout() {
                    tracing::warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = MAX_RETRIES,
                        "Connection error, will retry"
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
                return Err(HarvesterError::Http(e));
            }
        }
    }

    Err(HarvesterError::RetriesExhausted {
        attempts: MAX_RETRIES,
        message: last_error.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Read a `Retry-After` header given in seconds, capped.
fn retry_after(response: &Response) -> Option<Duration> {
    let secs: u64 = response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    Some(Duration::from_secs(secs.min(MAX_RETRY_AFTER_SECS)))
}

/// Decode a response body as UTF-8, replacing invalid sequences.
pub fn bytes_to_string(bytes: &[u8], source: &str) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(source, error = %e, "Response is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
