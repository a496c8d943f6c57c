//! Ticket creation hook tests

use std::sync::Arc;

use acton_oauth_cn::oauth2::{
    AuthenticationProperties, Claim, CreatingTicketContext, DoubanProvider, OAuthError,
    OAuthEvents,
};
use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::{callback, flow, issue_state, mock_config, TEST_ACCESS_TOKEN};

/// Adds a role claim and remembers the provider payload
struct AddRole;

#[async_trait]
impl OAuthEvents for AddRole {
    async fn creating_ticket(&self, ctx: &mut CreatingTicketContext<'_>) -> Result<(), OAuthError> {
        let issuer = ctx.scheme.to_string();
        ctx.identity.add_claim(Claim::new("urn:app:role", "member", &issuer));
        ctx.properties
            .set_item("douban_uid", ctx.user["uid"].as_str().map(str::to_string));
        Ok(())
    }
}

/// Rejects every sign-in
struct RejectAll;

#[async_trait]
impl OAuthEvents for RejectAll {
    async fn creating_ticket(&self, ctx: &mut CreatingTicketContext<'_>) -> Result<(), OAuthError> {
        Err(OAuthError::TicketRejected(format!(
            "{} sign-in disabled",
            ctx.provider
        )))
    }
}

async fn douban_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "access_token": TEST_ACCESS_TOKEN })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1000001",
            "uid": "ahbei",
            "name": "阿北"
        })))
        .mount(&server)
        .await;
    server
}

fn provider(server: &MockServer) -> DoubanProvider {
    DoubanProvider::new(
        &mock_config(server, "/auth", "/token", "/me"),
        reqwest::Client::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_events_can_add_claims_and_properties() {
    let server = douban_server().await;
    let flow = flow(provider(&server)).with_events(Arc::new(AddRole));
    let state = issue_state(&flow, AuthenticationProperties::default());

    let ticket = flow.handle_callback(callback(state)).await.unwrap();

    assert_eq!(ticket.principal.value_of("urn:app:role"), Some("member"));
    assert_eq!(ticket.properties.get_item("douban_uid"), Some("ahbei"));
    assert_eq!(ticket.principal.name(), Some("阿北"));
}

#[tokio::test]
async fn test_events_can_reject_ticket() {
    let server = douban_server().await;
    let flow = flow(provider(&server)).with_events(Arc::new(RejectAll));
    let state = issue_state(&flow, AuthenticationProperties::default());

    let err = flow.handle_callback(callback(state)).await.unwrap_err();
    assert!(matches!(err, OAuthError::TicketRejected(msg) if msg == "douban sign-in disabled"));
}
