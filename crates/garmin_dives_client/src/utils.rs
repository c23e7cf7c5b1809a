//! Response helpers shared by the reqwest clients.

use crate::GarminDivesError;
use std::time::Duration;

const SNIPPET_CHARS: usize = 256;

/// Truncate a response body for inclusion in error messages.
pub(crate) fn body_snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}

/// Build a reqwest client with the fixed per-request timeout.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, GarminDivesError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GarminDivesError::Config(format!("building http client: {e}")))
}

/// Extract error information from a failed response.
///
/// `login` marks responses to a credential exchange, where 401/403 means the
/// credentials were rejected rather than that a token expired.
pub(crate) async fn error_from_response(resp: reqwest::Response, login: bool) -> GarminDivesError {
    let status = resp.status().as_u16();
    let body = body_snippet(&resp.text().await.unwrap_or_default());

    match status {
        401 | 403 if login => GarminDivesError::Auth(body),
        401 => GarminDivesError::Unauthorized(body),
        403 => GarminDivesError::Auth(body),
        _ => GarminDivesError::from_status(status, body),
    }
}
