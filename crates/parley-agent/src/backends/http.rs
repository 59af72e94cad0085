use crate::config::BackendConfig;
use parley_core::{ParleyError, ParleyResult};
use std::time::Duration;

pub(crate) fn build_client(config: &BackendConfig) -> ParleyResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ParleyError::Http(format!("failed to build HTTP client: {e}")))
}

/// Sends `body` as JSON and returns the parsed response body.
///
/// Non-2xx statuses become [`ParleyError::Http`] carrying the status and the
/// raw body, so error payloads that are not JSON still reach the logs.
pub(crate) async fn post_json(
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
    api: &str,
) -> ParleyResult<serde_json::Value> {
    let resp = request
        .json(body)
        .send()
        .await
        .map_err(|e| ParleyError::Http(e.to_string()))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ParleyError::Http(e.to_string()))?;

    if !status.is_success() {
        return Err(ParleyError::Http(format!("{api} API error {status}: {text}")));
    }

    Ok(serde_json::from_str(&text)?)
}
