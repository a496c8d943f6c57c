//! Taobao OAuth2 provider implementation
//!
//! Taobao returns the user identity directly in the token response
//! (`taobao_user_id`, `taobao_user_nick`, ...). Its open APIs require a
//! separate signing scheme, so no profile endpoint is called.

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::oauth2::handler::OAuthHandler;
use crate::oauth2::identity::{claim_types, ClaimsIdentity};
use crate::oauth2::providers::BaseOAuthProvider;
use crate::oauth2::types::{
    json_string, OAuthError, OAuthTokenResponse, ProviderConfig, ProviderDefaults, ProviderKind,
};

/// Built-in Taobao endpoints
pub const DEFAULTS: ProviderDefaults = ProviderDefaults {
    authorization_endpoint: "https://oauth.taobao.com/authorize",
    token_endpoint: "https://oauth.taobao.com/token",
    user_information_endpoint: None,
    scope: &[],
};

/// Page style of the Taobao authorization page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaobaoView {
    /// Desktop page
    #[default]
    Web,
    /// Tmall-branded page
    Tmall,
    /// Mobile page
    Wap,
}

impl TaobaoView {
    /// Value of the `view` parameter
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Tmall => "tmall",
            Self::Wap => "wap",
        }
    }
}

/// Taobao configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaobaoConfig {
    /// Common provider settings
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Authorization page style
    #[serde(default)]
    pub view: TaobaoView,
}

/// Taobao user id
#[must_use]
pub fn get_id(payload: &Value) -> Option<String> {
    json_string(payload, "taobao_user_id")
}

/// Taobao nick, percent-decoded
#[must_use]
pub fn get_nick(payload: &Value) -> Option<String> {
    json_string(payload, "taobao_user_nick").map(|nick| decode(&nick))
}

/// Open uid scoped to the application
#[must_use]
pub fn get_open_uid(payload: &Value) -> Option<String> {
    json_string(payload, "taobao_open_uid")
}

/// Sub-account id, when a sub-account signed in
#[must_use]
pub fn get_sub_id(payload: &Value) -> Option<String> {
    json_string(payload, "sub_taobao_user_id")
}

/// Sub-account nick, percent-decoded
#[must_use]
pub fn get_sub_nick(payload: &Value) -> Option<String> {
    json_string(payload, "sub_taobao_user_nick").map(|nick| decode(&nick))
}

fn decode(value: &str) -> String {
    urlencoding::decode(value).map_or_else(|_| value.to_string(), |v| v.into_owned())
}

/// Taobao OAuth2 provider
#[derive(Debug, Clone)]
pub struct TaobaoProvider {
    base: BaseOAuthProvider,
    view: TaobaoView,
}

impl TaobaoProvider {
    /// Create a new Taobao provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &TaobaoConfig, http_client: reqwest::Client) -> Result<Self, OAuthError> {
        let options = config.provider.to_options(ProviderKind::Taobao, &DEFAULTS);
        Ok(Self {
            base: BaseOAuthProvider::new(ProviderKind::Taobao, options, http_client)?,
            view: config.view,
        })
    }
}

#[async_trait]
impl OAuthHandler for TaobaoProvider {
    fn base(&self) -> &BaseOAuthProvider {
        &self.base
    }

    fn format_scope(&self) -> String {
        self.options().scope.join(",")
    }

    fn build_challenge_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = self
            .base
            .standard_challenge_url(&self.format_scope(), state, redirect_uri)?;
        url.query_pairs_mut().append_pair("view", self.view.as_str());
        Ok(url)
    }

    async fn create_identity(
        &self,
        identity: &mut ClaimsIdentity,
        tokens: &OAuthTokenResponse,
    ) -> Result<Value, OAuthError> {
        let payload = &tokens.response;
        let issuer = self.options().issuer();

        let id = get_id(payload);
        identity.add_string_claim(claim_types::NAME_IDENTIFIER, id.as_deref(), issuer);
        identity.add_string_claim("urn:taobao:id", id.as_deref(), issuer);

        let nick = get_nick(payload);
        identity.add_string_claim(claim_types::NAME, nick.as_deref(), issuer);
        identity.add_string_claim("urn:taobao:nick", nick.as_deref(), issuer);

        identity.add_string_claim("urn:taobao:openuid", get_open_uid(payload).as_deref(), issuer);
        identity.add_string_claim("urn:taobao:sub_id", get_sub_id(payload).as_deref(), issuer);
        identity.add_string_claim("urn:taobao:sub_nick", get_sub_nick(payload).as_deref(), issuer);

        tracing::debug!(provider = "taobao", user_id = ?id, "mapped Taobao token response");
        Ok(payload.clone())
    }
}
