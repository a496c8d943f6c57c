//! Douban integration tests
//!
//! - Code exchange with a form POST
//! - Bearer profile call and claim mapping
//! - Token storage
//! - Error scenarios

use acton_oauth_cn::oauth2::{
    claim_types, AuthenticationProperties, DoubanProvider, OAuthError, ProviderConfig,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{callback, flow, issue_state, mock_config, TEST_ACCESS_TOKEN};

const TOKEN_PATH: &str = "/service/auth2/token";
const USERINFO_PATH: &str = "/v2/user/~me";

fn config(server: &MockServer) -> ProviderConfig {
    mock_config(server, "/service/auth2/auth", TOKEN_PATH, USERINFO_PATH)
}

async fn setup_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=mock_authorization_code"))
        .and(body_string_contains("client_secret=test-client-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "douban_user_name": "阿北",
            "douban_user_id": "1000001",
            "expires_in": 604_800,
            "refresh_token": "mock_refresh_token"
        })))
        .mount(server)
        .await;
}

async fn setup_userinfo(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(USERINFO_PATH))
        .and(header("authorization", "Bearer mock_access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1000001",
            "uid": "ahbei",
            "name": "阿北",
            "avatar": "https://img3.doubanio.com/icon/u1000001-28.jpg",
            "loc_name": "北京"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_douban_sign_in_happy_path() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    setup_userinfo(&server).await;

    let flow = flow(DoubanProvider::new(&config(&server), reqwest::Client::new()).unwrap());
    let state = issue_state(&flow, AuthenticationProperties::with_redirect_uri("/home"));

    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    assert_eq!(ticket.authentication_scheme, "Douban");
    assert_eq!(ticket.properties.redirect_uri.as_deref(), Some("/home"));
    let identity = &ticket.principal;
    assert!(identity.is_authenticated());
    assert_eq!(identity.value_of(claim_types::NAME_IDENTIFIER), Some("1000001"));
    assert_eq!(identity.value_of("urn:douban:id"), Some("1000001"));
    assert_eq!(identity.name(), Some("阿北"));
    assert_eq!(identity.value_of("urn:douban:uid"), Some("ahbei"));
    assert!(identity.value_of("urn:douban:avatar").is_some());
    assert!(ticket.properties.token("access_token").is_none());
}

#[tokio::test]
async fn test_douban_save_tokens() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    setup_userinfo(&server).await;

    let config = ProviderConfig {
        save_tokens: true,
        ..config(&server)
    };
    let flow = flow(DoubanProvider::new(&config, reqwest::Client::new()).unwrap());
    let state = issue_state(&flow, AuthenticationProperties::default());

    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    assert_eq!(ticket.properties.token("access_token"), Some(TEST_ACCESS_TOKEN));
    assert_eq!(ticket.properties.token("refresh_token"), Some("mock_refresh_token"));
    assert!(ticket.properties.token("expires_at").is_some());
}

#[tokio::test]
async fn test_douban_token_endpoint_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "msg": "invalid_authorization_code",
            "code": 113
        })))
        .mount(&server)
        .await;

    let flow = flow(DoubanProvider::new(&config(&server), reqwest::Client::new()).unwrap());
    let state = issue_state(&flow, AuthenticationProperties::default());

    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::TokenExchangeFailed(msg) if msg.contains("400")));
}

#[tokio::test]
async fn test_douban_empty_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "" })))
        .mount(&server)
        .await;

    let flow = flow(DoubanProvider::new(&config(&server), reqwest::Client::new()).unwrap());
    let state = issue_state(&flow, AuthenticationProperties::default());

    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::TokenExchangeFailed(_)));
}

#[tokio::test]
async fn test_douban_userinfo_error() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(USERINFO_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let flow = flow(DoubanProvider::new(&config(&server), reqwest::Client::new()).unwrap());
    let state = issue_state(&flow, AuthenticationProperties::default());

    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::UserInfoFailed(msg) if msg.contains("401")));
}
