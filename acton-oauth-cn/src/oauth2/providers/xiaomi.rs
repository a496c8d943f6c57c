//! XiaoMI account provider implementation
//!
//! The token endpoint is called with GET and answers with a JSON body
//! prefixed by `&&&START&&&`. Tokens are either bearer tokens or MAC
//! tokens; in MAC mode the profile request is signed with the `mac_key`
//! returned alongside the access token (see [`crate::oauth2::mac`]).

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::oauth2::handler::OAuthHandler;
use crate::oauth2::http::{parse_json, read_text};
use crate::oauth2::identity::{claim_types, ClaimsIdentity};
use crate::oauth2::mac::{self, DEFAULT_MAC_ALGORITHM};
use crate::oauth2::providers::BaseOAuthProvider;
use crate::oauth2::types::{
    json_string, OAuthError, OAuthTokenResponse, ProviderConfig, ProviderDefaults, ProviderKind,
};

/// Built-in XiaoMI endpoints
pub const DEFAULTS: ProviderDefaults = ProviderDefaults {
    authorization_endpoint: "https://account.xiaomi.com/oauth2/authorize",
    token_endpoint: "https://account.xiaomi.com/oauth2/token",
    user_information_endpoint: Some("https://open.account.xiaomi.com/user/profile"),
    scope: &[],
};

/// Prefix XiaoMI puts in front of the token response JSON
pub const TOKEN_RESPONSE_PREFIX: &str = "&&&START&&&";

/// Token type requested from XiaoMI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MiTokenType {
    /// Plain bearer token
    #[default]
    Bearer,
    /// MAC token, requests are signed with `mac_key`
    Mac,
}

impl MiTokenType {
    /// Value of the `token_type` parameter
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::Mac => "mac",
        }
    }

    fn from_response(token_type: Option<&str>) -> Self {
        match token_type {
            Some(t) if t.eq_ignore_ascii_case("mac") => Self::Mac,
            _ => Self::Bearer,
        }
    }
}

/// XiaoMI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XiaoMiConfig {
    /// Common provider settings
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Skip the confirmation page for users who already authorized the app
    #[serde(default)]
    pub skip_confirm: bool,
    /// Token type to request
    #[serde(default)]
    pub token_type: MiTokenType,
}

fn data(payload: &Value) -> &Value {
    payload.get("data").unwrap_or(&Value::Null)
}

/// XiaoMI user id
#[must_use]
pub fn get_id(payload: &Value) -> Option<String> {
    json_string(data(payload), "userId")
}

/// Miliao nickname
#[must_use]
pub fn get_nick_name(payload: &Value) -> Option<String> {
    json_string(data(payload), "miliaoNick")
}

/// Miliao avatar URL
#[must_use]
pub fn get_icon(payload: &Value) -> Option<String> {
    json_string(data(payload), "miliaoIcon")
}

/// Parse a token endpoint body, dropping the `&&&START&&&` prefix
///
/// # Errors
///
/// Returns `OAuthError::TokenExchangeFailed` if the body is not JSON and
/// `OAuthError::ProviderError` if it carries an `error` field
pub fn parse_token_body(body: &str) -> Result<Value, OAuthError> {
    let body = body.trim_start();
    let json = body.strip_prefix(TOKEN_RESPONSE_PREFIX).unwrap_or(body);
    let payload = parse_json(json, OAuthError::TokenExchangeFailed)?;

    if let Some(code) = json_string(&payload, "error") {
        return Err(OAuthError::ProviderError {
            code,
            message: json_string(&payload, "error_description").unwrap_or_default(),
        });
    }
    Ok(payload)
}

/// XiaoMI OAuth2 provider
#[derive(Debug, Clone)]
pub struct XiaoMiProvider {
    base: BaseOAuthProvider,
    skip_confirm: bool,
    token_type: MiTokenType,
}

impl XiaoMiProvider {
    /// Create a new XiaoMI provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &XiaoMiConfig, http_client: reqwest::Client) -> Result<Self, OAuthError> {
        let options = config.provider.to_options(ProviderKind::XiaoMi, &DEFAULTS);
        Ok(Self {
            base: BaseOAuthProvider::new(ProviderKind::XiaoMi, options, http_client)?,
            skip_confirm: config.skip_confirm,
            token_type: config.token_type,
        })
    }

    /// Build the profile request, signed when the token is a MAC token
    fn profile_request(&self, tokens: &OAuthTokenResponse) -> Result<reqwest::RequestBuilder, OAuthError> {
        let url = BaseOAuthProvider::endpoint_url(
            self.base.user_information_endpoint()?,
            &[
                ("clientId", self.options().client_id.as_str()),
                ("token", tokens.access_token.as_str()),
            ],
        )?;
        let request = self.base.http_client().get(url.clone());

        match MiTokenType::from_response(tokens.token_type.as_deref()) {
            MiTokenType::Bearer => Ok(request),
            MiTokenType::Mac => {
                let key = tokens.value("mac_key").ok_or_else(|| {
                    OAuthError::TokenExchangeFailed("MAC token response has no mac_key".to_string())
                })?;
                let algorithm = tokens
                    .value("mac_algorithm")
                    .unwrap_or_else(|| DEFAULT_MAC_ALGORITHM.to_string());
                let header = mac::authorization_header(
                    &tokens.access_token,
                    &key,
                    &algorithm,
                    &Method::GET,
                    &url,
                )?;
                Ok(request.header(reqwest::header::AUTHORIZATION, format!("MAC {header}")))
            }
        }
    }
}

#[async_trait]
impl OAuthHandler for XiaoMiProvider {
    fn base(&self) -> &BaseOAuthProvider {
        &self.base
    }

    fn build_challenge_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = self
            .base
            .standard_challenge_url(&self.format_scope(), state, redirect_uri)?;
        if self.skip_confirm {
            url.query_pairs_mut().append_pair("skip_confirm", "true");
        }
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let options = self.options();
        let query = [
            ("client_id", options.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("client_secret", options.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("token_type", self.token_type.as_str()),
        ];

        let response = self
            .base
            .http_client()
            .get(&options.token_endpoint)
            .query(&query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        let body = read_text(response, OAuthError::TokenExchangeFailed).await?;
        Ok(OAuthTokenResponse::from_json(parse_token_body(&body)?))
    }

    async fn create_identity(
        &self,
        identity: &mut ClaimsIdentity,
        tokens: &OAuthTokenResponse,
    ) -> Result<Value, OAuthError> {
        let issuer = self.options().issuer();
        identity.add_string_claim("urn:mi:openid", tokens.value("openId").as_deref(), issuer);

        let request = self.profile_request(tokens)?;
        let payload = BaseOAuthProvider::send_for_user_info(request).await?;

        let id = get_id(&payload);
        identity.add_string_claim(claim_types::NAME_IDENTIFIER, id.as_deref(), issuer);
        identity.add_string_claim("urn:mi:id", id.as_deref(), issuer);

        let name = get_nick_name(&payload);
        identity.add_string_claim(claim_types::NAME, name.as_deref(), issuer);
        identity.add_string_claim("urn:mi:nickname", name.as_deref(), issuer);

        identity.add_string_claim("urn:mi:icon", get_icon(&payload).as_deref(), issuer);

        tracing::debug!(provider = "xiaomi", user_id = ?id, "mapped XiaoMI profile");
        Ok(payload)
    }
}
