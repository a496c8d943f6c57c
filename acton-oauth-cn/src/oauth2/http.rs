//! Shared HTTP backchannel for OAuth2 providers
//!
//! Every provider talks to its token and profile endpoints through one
//! `reqwest::Client`. Redirects are disabled: token endpoints must answer
//! directly.

use std::time::Duration;

use serde_json::Value;

use super::types::OAuthError;

/// User agent sent on backchannel requests
pub const USER_AGENT: &str = concat!("acton-oauth-cn/", env!("CARGO_PKG_VERSION"));

/// Build the backchannel HTTP client
///
/// # Errors
///
/// Returns `OAuthError::Generic` if the client cannot be built
pub fn backchannel(timeout: Duration) -> Result<reqwest::Client, OAuthError> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| OAuthError::Generic(format!("Failed to build HTTP client: {e}")))
}

/// Read a response body as JSON after checking the status
///
/// `fail` wraps the error message into the variant matching the step
/// (token exchange or user information).
///
/// # Errors
///
/// Returns the `fail` error on a non-success status or a malformed body
pub async fn read_json(
    response: reqwest::Response,
    fail: fn(String) -> OAuthError,
) -> Result<Value, OAuthError> {
    let body = read_text(response, fail).await?;
    parse_json(&body, fail)
}

/// Read a response body as text after checking the status
///
/// # Errors
///
/// Returns the `fail` error on a non-success status or an unreadable body
pub async fn read_text(
    response: reqwest::Response,
    fail: fn(String) -> OAuthError,
) -> Result<String, OAuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "provider endpoint returned an error status");
        return Err(fail(format!("HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| fail(format!("Failed to read response body: {e}")))
}

/// Parse a JSON body
///
/// # Errors
///
/// Returns the `fail` error if the body is not JSON
pub fn parse_json(body: &str, fail: fn(String) -> OAuthError) -> Result<Value, OAuthError> {
    serde_json::from_str(body).map_err(|e| fail(format!("Failed to parse JSON: {e}")))
}
