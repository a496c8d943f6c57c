//! XiaoMI integration tests
//!
//! - GET token exchange answering with a `&&&START&&&`-prefixed body
//! - MAC-signed profile request
//! - Bearer profile request
//! - `error` bodies

use acton_oauth_cn::oauth2::{
    mac, AuthenticationProperties, MiTokenType, OAuthError, XiaoMiConfig, XiaoMiProvider,
};
use serde_json::json;
use wiremock::matchers::{header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{
    callback, flow, issue_state, mock_config, TEST_ACCESS_TOKEN, TEST_AUTH_CODE,
};

const TOKEN_PATH: &str = "/oauth2/token";
const PROFILE_PATH: &str = "/user/profile";
const MAC_KEY: &str = "mock_mac_key";

fn provider(server: &MockServer, token_type: MiTokenType) -> XiaoMiProvider {
    let config = XiaoMiConfig {
        provider: mock_config(server, "/oauth2/authorize", TOKEN_PATH, PROFILE_PATH),
        skip_confirm: true,
        token_type,
    };
    XiaoMiProvider::new(&config, reqwest::Client::new()).unwrap()
}

async fn setup_token_endpoint(server: &MockServer, token_type: &str) {
    let body = json!({
        "access_token": TEST_ACCESS_TOKEN,
        "expires_in": 360_000,
        "refresh_token": "mock_refresh_token",
        "scope": "1 3",
        "token_type": token_type,
        "mac_key": MAC_KEY,
        "mac_algorithm": "HmacSha1",
        "openId": "2882303761517_open"
    });

    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(query_param("client_id", "test-client-id"))
        .and(query_param("client_secret", "test-client-secret"))
        .and(query_param("grant_type", "authorization_code"))
        .and(query_param("code", TEST_AUTH_CODE))
        .and(query_param("token_type", token_type))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!("&&&START&&&{body}")))
        .mount(server)
        .await;
}

fn profile_body() -> serde_json::Value {
    json!({
        "result": "ok",
        "description": "成功",
        "data": {
            "userId": 12_345_678,
            "miliaoNick": "米粉",
            "miliaoIcon": "https://s1.mi-img.com/mfsv2/avatar/0.jpg"
        },
        "code": 0
    })
}

#[tokio::test]
async fn test_xiaomi_mac_sign_in() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server, "mac").await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .and(query_param("clientId", "test-client-id"))
        .and(query_param("token", TEST_ACCESS_TOKEN))
        .and(header_regex(
            "authorization",
            r#"^MAC access_token="mock_access_token", nonce="\d+%3A\d+",mac="[^"]+"$"#,
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let flow = flow(provider(&server, MiTokenType::Mac));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    let identity = &ticket.principal;
    assert_eq!(ticket.authentication_scheme, "XiaoMI");
    assert_eq!(identity.value_of("urn:mi:openid"), Some("2882303761517_open"));
    assert_eq!(identity.name_identifier(), Some("12345678"));
    assert_eq!(identity.value_of("urn:mi:id"), Some("12345678"));
    assert_eq!(identity.name(), Some("米粉"));
    assert_eq!(identity.value_of("urn:mi:nickname"), Some("米粉"));
    assert!(identity.value_of("urn:mi:icon").is_some());
}

#[tokio::test]
async fn test_xiaomi_mac_signature_matches_request() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server, "mac").await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let flow = flow(provider(&server, MiTokenType::Mac));
    let state = issue_state(&flow, AuthenticationProperties::default());
    flow.handle_callback(callback(state)).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let profile = requests
        .iter()
        .find(|r| r.url.path() == PROFILE_PATH)
        .unwrap();
    let header = profile.headers["authorization"].to_str().unwrap();
    let params = header.strip_prefix("MAC ").unwrap();

    let nonce_escaped = params
        .split("nonce=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap();
    let nonce = urlencoding::decode(nonce_escaped).unwrap();

    // The mock server reports its host as `localhost`; sign against the
    // address the client actually called
    let signed_url = reqwest::Url::parse(&format!(
        "{}{}?{}",
        server.uri(),
        PROFILE_PATH,
        profile.url.query().unwrap()
    ))
    .unwrap();

    let expected = mac::authorization_header_with_nonce(
        TEST_ACCESS_TOKEN,
        MAC_KEY,
        "HmacSha1",
        &reqwest::Method::GET,
        &signed_url,
        &nonce,
    )
    .unwrap();
    assert_eq!(params, expected);
}

#[tokio::test]
async fn test_xiaomi_bearer_profile_is_unsigned() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server, "bearer").await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body()))
        .mount(&server)
        .await;

    let flow = flow(provider(&server, MiTokenType::Bearer));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let ticket = flow.handle_callback(callback(state)).await.unwrap();
    assert_eq!(ticket.principal.name_identifier(), Some("12345678"));

    let requests = server.received_requests().await.unwrap();
    let profile = requests
        .iter()
        .find(|r| r.url.path() == PROFILE_PATH)
        .unwrap();
    assert!(!profile.headers.contains_key("authorization"));
}

#[tokio::test]
async fn test_xiaomi_token_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"&&&START&&&{"error":96009,"error_description":"code expired"}"#,
        ))
        .mount(&server)
        .await;

    let flow = flow(provider(&server, MiTokenType::Mac));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::ProviderError { code, .. } if code == "96009"));
}

#[tokio::test]
async fn test_xiaomi_profile_http_error() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server, "mac").await;
    Mock::given(method("GET"))
        .and(path(PROFILE_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let flow = flow(provider(&server, MiTokenType::Mac));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::UserInfoFailed(msg) if msg.contains("403")));
}

#[tokio::test]
async fn test_xiaomi_challenge_skip_confirm() {
    let server = MockServer::start().await;
    let flow = flow(provider(&server, MiTokenType::Bearer));
    let url = flow
        .challenge(AuthenticationProperties::default(), "https://app.example.com/cb")
        .unwrap()
        .url;
    assert!(url.query_pairs().any(|(k, v)| k == "skip_confirm" && v == "true"));
}
