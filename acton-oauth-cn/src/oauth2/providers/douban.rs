//! Douban OAuth2 provider implementation
//!
//! Douban follows plain OAuth2: a form POST for the code exchange and a
//! bearer-authenticated call to `/v2/user/~me` for the profile. Scopes are
//! comma separated.

use async_trait::async_trait;
use serde_json::Value;

use crate::oauth2::handler::OAuthHandler;
use crate::oauth2::identity::{claim_types, ClaimsIdentity};
use crate::oauth2::providers::BaseOAuthProvider;
use crate::oauth2::types::{
    json_string, OAuthError, OAuthTokenResponse, ProviderConfig, ProviderDefaults, ProviderKind,
};

/// Built-in Douban endpoints
pub const DEFAULTS: ProviderDefaults = ProviderDefaults {
    authorization_endpoint: "https://www.douban.com/service/auth2/auth",
    token_endpoint: "https://www.douban.com/service/auth2/token",
    user_information_endpoint: Some("https://api.douban.com/v2/user/~me"),
    scope: &["douban_basic_common"],
};

/// Douban user id
#[must_use]
pub fn get_id(payload: &Value) -> Option<String> {
    json_string(payload, "id")
}

/// Douban display name
#[must_use]
pub fn get_name(payload: &Value) -> Option<String> {
    json_string(payload, "name")
}

/// Avatar URL
#[must_use]
pub fn get_avatar(payload: &Value) -> Option<String> {
    json_string(payload, "avatar")
}

/// Douban `uid` (the vanity name used in profile URLs)
#[must_use]
pub fn get_uid(payload: &Value) -> Option<String> {
    json_string(payload, "uid")
}

/// Douban OAuth2 provider
#[derive(Debug, Clone)]
pub struct DoubanProvider {
    base: BaseOAuthProvider,
}

impl DoubanProvider {
    /// Create a new Douban provider
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid
    pub fn new(config: &ProviderConfig, http_client: reqwest::Client) -> Result<Self, OAuthError> {
        let options = config.to_options(ProviderKind::Douban, &DEFAULTS);
        Ok(Self {
            base: BaseOAuthProvider::new(ProviderKind::Douban, options, http_client)?,
        })
    }
}

#[async_trait]
impl OAuthHandler for DoubanProvider {
    fn base(&self) -> &BaseOAuthProvider {
        &self.base
    }

    fn format_scope(&self) -> String {
        self.options().scope.join(",")
    }

    async fn create_identity(
        &self,
        identity: &mut ClaimsIdentity,
        tokens: &OAuthTokenResponse,
    ) -> Result<Value, OAuthError> {
        let endpoint = self.base.user_information_endpoint()?;
        let payload = self
            .base
            .fetch_user_info_bearer(endpoint, &tokens.access_token)
            .await?;

        let issuer = self.options().issuer();
        let id = get_id(&payload);
        identity.add_string_claim(claim_types::NAME_IDENTIFIER, id.as_deref(), issuer);
        identity.add_string_claim("urn:douban:id", id.as_deref(), issuer);

        let name = get_name(&payload);
        identity.add_string_claim(claim_types::NAME, name.as_deref(), issuer);
        identity.add_string_claim("urn:douban:name", name.as_deref(), issuer);

        identity.add_string_claim("urn:douban:avatar", get_avatar(&payload).as_deref(), issuer);
        identity.add_string_claim("urn:douban:uid", get_uid(&payload).as_deref(), issuer);

        tracing::debug!(provider = "douban", user_id = ?id, "mapped Douban profile");
        Ok(payload)
    }
}
