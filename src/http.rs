//! Blocking HTTP plumbing shared by the minter and the binder.
//!
//! # Retry Strategy
//!
//! Only transport failures (connect errors, timeouts, truncated responses) are
//! retried. Any response that arrives, whatever its status, is handed back to
//! the caller unchanged.
//! - Attempts: `1 + http.max_retries`
//! - Backoff: `retry_base_ms`, doubled per attempt, exponent capped at 2^5

use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::config::HttpConfig;
use crate::error::ArkError;

/// Build a blocking client with the configured timeout.
pub fn build_client(http: &HttpConfig) -> Result<Client, ArkError> {
    Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .build()
        .map_err(|source| ArkError::Connection {
            url: String::from("<client setup>"),
            source,
        })
}

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(http: &HttpConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(5);
    Duration::from_millis(http.retry_base_ms.saturating_mul(1 << exp))
}

/// `GET url`, retrying transport failures with exponential backoff.
pub fn get_with_retry(client: &Client, http: &HttpConfig, url: &str) -> Result<Response, ArkError> {
    let mut attempt = 0;

    loop {
        match client.get(url).send() {
            Ok(response) => return Ok(response),
            Err(source) => {
                tracing::warn!(url, attempt, error = %source, "request failed");
                if attempt >= http.max_retries {
                    return Err(ArkError::Connection {
                        url: url.to_string(),
                        source,
                    });
                }
            }
        }

        attempt += 1;
        let delay = backoff_delay(http, attempt);
        tracing::debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
        std::thread::sleep(delay);
    }
}
