//! Shared plumbing for the HTTP engine adapters.

use std::time::Duration;

use crate::ports::PortError;

/// Build a client with a per-request timeout.
///
/// A default (no-timeout) client is used if the builder fails; the queue's
/// attempt timeout still bounds every call.
pub(crate) fn client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("engines: HTTP client builder failed ({e}), using defaults");
            reqwest::Client::new()
        })
}

/// `base` joined with `path`, without doubling the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Attach a bearer token when `api_key` is a non-empty string.
pub(crate) fn with_auth(req: reqwest::RequestBuilder, api_key: Option<&str>) -> reqwest::RequestBuilder {
    match api_key {
        Some(key) if !key.is_empty() => req.bearer_auth(key),
        _ => req,
    }
}

/// Pass successful responses through; turn error statuses into a
/// [`PortError`] carrying (a bounded prefix of) the response body.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PortError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PortError::from_status(status.as_u16(), truncate(body.trim(), 300)))
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
