//! Shared send loop for the HTTP providers

use regex::Regex;
use reqwest::{RequestBuilder, Response};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use super::LlmError;
use super::error::{is_retryable_status, parse_retry_after};

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

static RETRY_DELAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""retryDelay"\s*:\s*"(\d+)(?:\.\d+)?s""#).expect("retry delay pattern is valid"));

/// Send a request, retrying transient failures with exponential backoff
///
/// `build` is called once per attempt. Rate limits are returned at once
/// with whatever wait hint the provider gave.
pub(crate) async fn send_with_retry<F>(label: &str, build: F) -> Result<Response, LlmError>
where
    F: Fn() -> RequestBuilder,
{
    debug!(%label, "send_with_retry: called");
    let mut last_error = None;
    for attempt in 0..=MAX_RETRIES {
        if attempt > 0 {
            let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
            warn!(
                %label,
                attempt,
                backoff_ms = backoff,
                "send_with_retry: retrying after transient error"
            );
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        let response = match build().send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(attempt, "send_with_retry: timeout");
                last_error = Some(LlmError::Timeout);
                continue;
            }
            Err(e) => {
                debug!(attempt, error = %e, "send_with_retry: network error");
                last_error = Some(LlmError::Network(e));
                continue;
            }
        };

        let status = response.status().as_u16();

        if status == 429 {
            debug!("send_with_retry: rate limited (429)");
            let header = parse_retry_after(response.headers().get("retry-after").and_then(|v| v.to_str().ok()));
            let retry_after = match header {
                Some(d) => Some(d),
                None => retry_delay_from_body(&response.text().await.unwrap_or_default()),
            };
            return Err(LlmError::RateLimited { retry_after });
        }

        if is_retryable_status(status) && attempt < MAX_RETRIES {
            let text = response.text().await.unwrap_or_default();
            debug!(attempt, status, "send_with_retry: retryable error");
            last_error = Some(LlmError::from_status(status, text));
            continue;
        }

        if !response.status().is_success() {
            debug!(%status, "send_with_retry: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, text));
        }

        debug!("send_with_retry: success");
        return Ok(response);
    }

    Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
}

/// Extract a `retryDelay` hint from a quota error body
fn retry_delay_from_body(body: &str) -> Option<Duration> {
    RETRY_DELAY
        .captures(body)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(Duration::from_secs)
}
