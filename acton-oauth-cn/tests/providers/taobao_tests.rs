//! Taobao integration tests
//!
//! Identity comes from the token response; no profile endpoint is called.

use acton_oauth_cn::oauth2::{
    AuthenticationProperties, OAuthError, TaobaoConfig, TaobaoProvider, TaobaoView,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{callback, flow, issue_state, mock_config, TEST_ACCESS_TOKEN};

fn config(server: &MockServer, view: TaobaoView) -> TaobaoConfig {
    TaobaoConfig {
        provider: mock_config(server, "/authorize", "/token", "/unused"),
        view,
    }
}

#[tokio::test]
async fn test_taobao_sign_in_from_token_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=mock_authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 86_400,
            "refresh_token": "mock_refresh_token",
            "taobao_user_id": "3699423010",
            "taobao_user_nick": "%E5%BA%97%E5%B0%8F%E4%BA%8C",
            "taobao_open_uid": "AAHJ3wzuAAiY2ie_KL2RLTJf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TaobaoProvider::new(&config(&server, TaobaoView::Web), reqwest::Client::new())
        .unwrap();
    let flow = flow(provider);
    let state = issue_state(&flow, AuthenticationProperties::default());

    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    assert_eq!(ticket.authentication_scheme, "Taobao");
    assert_eq!(ticket.principal.name_identifier(), Some("3699423010"));
    assert_eq!(ticket.principal.name(), Some("店小二"));
    assert_eq!(ticket.principal.value_of("urn:taobao:nick"), Some("店小二"));
    assert_eq!(
        ticket.principal.value_of("urn:taobao:openuid"),
        Some("AAHJ3wzuAAiY2ie_KL2RLTJf")
    );
    // Only the token request reached the server
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_taobao_challenge_view() {
    let server = MockServer::start().await;
    let provider = TaobaoProvider::new(&config(&server, TaobaoView::Tmall), reqwest::Client::new())
        .unwrap();
    let flow = flow(provider);

    let url = flow
        .challenge(AuthenticationProperties::default(), "https://app.example.com/cb")
        .unwrap()
        .url;
    assert!(url.query_pairs().any(|(k, v)| k == "view" && v == "tmall"));
    assert!(url.query_pairs().any(|(k, v)| k == "response_type" && v == "code"));
}

#[tokio::test]
async fn test_taobao_token_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "client_id is invalid"
        })))
        .mount(&server)
        .await;

    let provider = TaobaoProvider::new(&config(&server, TaobaoView::Web), reqwest::Client::new())
        .unwrap();
    let flow = flow(provider);
    let state = issue_state(&flow, AuthenticationProperties::default());

    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::TokenExchangeFailed(_)));
}
