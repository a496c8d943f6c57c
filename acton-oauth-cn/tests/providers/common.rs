//! Common test utilities and fixtures for provider integration tests

use std::sync::Arc;

use acton_oauth_cn::oauth2::{
    AuthenticationProperties, CallbackParams, Challenge, OAuthFlow, OAuthHandler, ProviderConfig,
    StateProtector,
};
use wiremock::MockServer;

pub const TEST_AUTH_CODE: &str = "mock_authorization_code";
pub const TEST_ACCESS_TOKEN: &str = "mock_access_token";
pub const TEST_STATE_SECRET: &str = "integration-test-secret";
pub const TEST_REDIRECT_URI: &str = "https://app.example.com/signin-callback";

/// Provider configuration whose endpoints all point at `server`
#[must_use]
pub fn mock_config(
    server: &MockServer,
    auth_path: &str,
    token_path: &str,
    userinfo_path: &str,
) -> ProviderConfig {
    ProviderConfig {
        auth_url: Some(format!("{}{auth_path}", server.uri())),
        token_url: Some(format!("{}{token_path}", server.uri())),
        userinfo_url: Some(format!("{}{userinfo_path}", server.uri())),
        ..ProviderConfig::new("test-client-id", "test-client-secret")
    }
}

/// Flow over `handler` with the test state secret
#[must_use]
pub fn flow(handler: impl OAuthHandler + 'static) -> OAuthFlow {
    OAuthFlow::new(
        Arc::new(handler),
        StateProtector::new(TEST_STATE_SECRET, 900).unwrap(),
    )
}

/// Run the challenge as a browser would
#[must_use]
pub fn issue_state(flow: &OAuthFlow, properties: AuthenticationProperties) -> Challenge {
    flow.challenge(properties, TEST_REDIRECT_URI).unwrap()
}

/// Callback parameters for a successful authorization of `challenge`
#[must_use]
pub fn callback(challenge: Challenge) -> CallbackParams {
    let state = challenge
        .url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    CallbackParams {
        code: Some(TEST_AUTH_CODE.to_string()),
        state: Some(state),
        correlation: Some(challenge.correlation),
        ..Default::default()
    }
}
