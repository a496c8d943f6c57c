//! WeChat (Weixin) Open Platform provider implementation
//!
//! WeChat deviates from OAuth2 in a few places:
//!
//! - the client is identified by `appid` / `secret` instead of
//!   `client_id` / `client_secret`
//! - the token endpoint is called with GET and query parameters
//! - failures come back as HTTP 200 with an `errcode` / `errmsg` body
//! - the authorization URL must end with the `#wechat_redirect` fragment

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::oauth2::handler::OAuthHandler;
use crate::oauth2::http::read_json;
use crate::oauth2::identity::{claim_types, ClaimsIdentity};
use crate::oauth2::providers::BaseOAuthProvider;
use crate::oauth2::types::{
    json_string, OAuthError, OAuthTokenResponse, ProviderConfig, ProviderDefaults, ProviderKind,
};

/// Built-in WeChat endpoints
pub const DEFAULTS: ProviderDefaults = ProviderDefaults {
    authorization_endpoint: "https://open.weixin.qq.com/connect/qrconnect",
    token_endpoint: "https://api.weixin.qq.com/sns/oauth2/access_token",
    user_information_endpoint: Some("https://api.weixin.qq.com/sns/userinfo"),
    scope: &["snsapi_login"],
};

/// Fragment WeChat requires on the authorization URL
const REDIRECT_FRAGMENT: &str = "wechat_redirect";

/// Open id of the user, from the token response
#[must_use]
pub fn get_id(payload: &Value) -> Option<String> {
    json_string(payload, "openid")
}

/// Union id shared across the applications of one developer account
#[must_use]
pub fn get_union_id(payload: &Value) -> Option<String> {
    json_string(payload, "unionid")
}

/// Nickname
#[must_use]
pub fn get_name(payload: &Value) -> Option<String> {
    json_string(payload, "nickname")
}

/// Avatar URL
#[must_use]
pub fn get_head_image(payload: &Value) -> Option<String> {
    json_string(payload, "headimgurl")
}

/// Fail on a WeChat error body
///
/// # Errors
///
/// Returns `OAuthError::ProviderError` when `errcode` is present and non-zero
pub fn check_errcode(payload: &Value) -> Result<(), OAuthError> {
    match json_string(payload, "errcode") {
        Some(code) if code != "0" => Err(OAuthError::ProviderError {
            code,
            message: json_string(payload, "errmsg").unwrap_or_default(),
        }),
        _ => Ok(()),
    }
}

/// WeChat OAuth2 provider
#[derive(Debug, Clone)]
pub struct WeChatProvider {
    base: BaseOAuthProvider,
}

impl WeChatProvider {
    /// Create a new WeChat provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &ProviderConfig, http_client: reqwest::Client) -> Result<Self, OAuthError> {
        let options = config.to_options(ProviderKind::WeChat, &DEFAULTS);
        Ok(Self {
            base: BaseOAuthProvider::new(ProviderKind::WeChat, options, http_client)?,
        })
    }

    async fn fetch_profile(&self, access_token: &str, openid: &str) -> Result<Value, OAuthError> {
        let endpoint = self.base.user_information_endpoint()?;
        let request = self
            .base
            .http_client()
            .get(endpoint)
            .query(&[("access_token", access_token), ("openid", openid)]);
        let payload = BaseOAuthProvider::send_for_user_info(request).await?;
        check_errcode(&payload)?;
        Ok(payload)
    }
}

#[async_trait]
impl OAuthHandler for WeChatProvider {
    fn base(&self) -> &BaseOAuthProvider {
        &self.base
    }

    fn format_scope(&self) -> String {
        self.options().scope.join(",")
    }

    fn build_challenge_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        let options = self.options();
        let scope = self.format_scope();
        let mut url = BaseOAuthProvider::endpoint_url(
            &options.authorization_endpoint,
            &[
                ("appid", options.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )?;
        url.set_fragment(Some(REDIRECT_FRAGMENT));
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let options = self.options();
        let query = [
            ("appid", options.client_id.as_str()),
            ("secret", options.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .base
            .http_client()
            .get(&options.token_endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        let payload = read_json(response, |msg| {
            OAuthError::TokenExchangeFailed(format!(
                "{msg}; check the WeChat app id and secret and that the login API is enabled"
            ))
        })
        .await?;
        check_errcode(&payload)?;
        Ok(OAuthTokenResponse::from_json(payload))
    }

    async fn create_identity(
        &self,
        identity: &mut ClaimsIdentity,
        tokens: &OAuthTokenResponse,
    ) -> Result<Value, OAuthError> {
        let issuer = self.options().issuer();

        let openid = get_id(&tokens.response);
        identity.add_string_claim(claim_types::NAME_IDENTIFIER, openid.as_deref(), issuer);
        identity.add_string_claim("urn:wechat:id", openid.as_deref(), issuer);
        identity.add_string_claim(
            "urn:wechat:unionid",
            get_union_id(&tokens.response).as_deref(),
            issuer,
        );

        let payload = self
            .fetch_profile(&tokens.access_token, openid.as_deref().unwrap_or_default())
            .await?;

        let name = get_name(&payload);
        identity.add_string_claim(claim_types::NAME, name.as_deref(), issuer);
        identity.add_string_claim("urn:wechat:name", name.as_deref(), issuer);
        identity.add_string_claim(
            "urn:wechat:headimgurl",
            get_head_image(&payload).as_deref(),
            issuer,
        );
        for field in ["sex", "province", "city", "country"] {
            let claim_type = format!("urn:wechat:{field}");
            identity.add_string_claim(&claim_type, json_string(&payload, field).as_deref(), issuer);
        }

        tracing::debug!(provider = "wechat", openid = ?openid, "mapped WeChat profile");
        Ok(payload)
    }
}
