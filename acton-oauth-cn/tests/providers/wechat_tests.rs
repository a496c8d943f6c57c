//! WeChat integration tests
//!
//! - GET token exchange with `appid` / `secret`
//! - `errcode` bodies on HTTP 200
//! - Profile call with `access_token` and `openid`

use acton_oauth_cn::oauth2::{AuthenticationProperties, OAuthError, WeChatProvider};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{
    callback, flow, issue_state, mock_config, TEST_ACCESS_TOKEN, TEST_AUTH_CODE, TEST_REDIRECT_URI,
};

const TOKEN_PATH: &str = "/sns/oauth2/access_token";
const USERINFO_PATH: &str = "/sns/userinfo";
const OPENID: &str = "o6_bmjrPTlm6_2sgVt7hMZOPfL2M";

fn provider(server: &MockServer) -> WeChatProvider {
    WeChatProvider::new(
        &mock_config(server, "/connect/qrconnect", TOKEN_PATH, USERINFO_PATH),
        reqwest::Client::new(),
    )
    .unwrap()
}

async fn setup_token_endpoint(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .and(query_param("appid", "test-client-id"))
        .and(query_param("secret", "test-client-secret"))
        .and(query_param("code", TEST_AUTH_CODE))
        .and(query_param("grant_type", "authorization_code"))
        .and(query_param("redirect_uri", TEST_REDIRECT_URI))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TEST_ACCESS_TOKEN,
            "expires_in": 7200,
            "refresh_token": "mock_refresh_token",
            "openid": OPENID,
            "scope": "snsapi_login",
            "unionid": "o6_bmasdasdsad6_2sgVt7hMZOPfL"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_wechat_sign_in_happy_path() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(USERINFO_PATH))
        .and(query_param("access_token", TEST_ACCESS_TOKEN))
        .and(query_param("openid", OPENID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "openid": OPENID,
            "nickname": "张三",
            "sex": 1,
            "province": "广东",
            "city": "广州",
            "country": "中国",
            "headimgurl": "https://thirdwx.qlogo.cn/mmopen/0",
            "privilege": [],
            "unionid": "o6_bmasdasdsad6_2sgVt7hMZOPfL"
        })))
        .mount(&server)
        .await;

    let flow = flow(provider(&server));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    let identity = &ticket.principal;
    assert_eq!(ticket.authentication_scheme, "WeChat");
    assert_eq!(identity.name_identifier(), Some(OPENID));
    assert_eq!(identity.value_of("urn:wechat:id"), Some(OPENID));
    assert_eq!(
        identity.value_of("urn:wechat:unionid"),
        Some("o6_bmasdasdsad6_2sgVt7hMZOPfL")
    );
    assert_eq!(identity.name(), Some("张三"));
    assert_eq!(identity.value_of("urn:wechat:sex"), Some("1"));
    assert_eq!(identity.value_of("urn:wechat:city"), Some("广州"));
    assert_eq!(
        identity.value_of("urn:wechat:headimgurl"),
        Some("https://thirdwx.qlogo.cn/mmopen/0")
    );
}

#[tokio::test]
async fn test_wechat_errcode_on_token_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 40029,
            "errmsg": "invalid code"
        })))
        .mount(&server)
        .await;

    let flow = flow(provider(&server));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();

    match err {
        OAuthError::ProviderError { code, message } => {
            assert_eq!(code, "40029");
            assert_eq!(message, "invalid code");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wechat_errcode_on_userinfo() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(USERINFO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 40003,
            "errmsg": "invalid openid"
        })))
        .mount(&server)
        .await;

    let flow = flow(provider(&server));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::ProviderError { code, .. } if code == "40003"));
}

#[tokio::test]
async fn test_wechat_token_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let flow = flow(provider(&server));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::TokenExchangeFailed(msg) if msg.contains("503")));
}

#[tokio::test]
async fn test_wechat_userinfo_http_error() {
    let server = MockServer::start().await;
    setup_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path(USERINFO_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let flow = flow(provider(&server));
    let state = issue_state(&flow, AuthenticationProperties::default());
    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::UserInfoFailed(_)));
}
