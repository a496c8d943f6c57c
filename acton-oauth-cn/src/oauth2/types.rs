//! Core OAuth2 types and configuration
//!
//! This module defines the foundational types shared by every provider
//! adapter: provider identifiers, common options, the parsed token response
//! and the error type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// OAuth2 provider identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Douban (豆瓣)
    Douban,
    /// Taobao (淘宝)
    Taobao,
    /// WeChat open platform (微信)
    WeChat,
    /// XiaoMI account (小米)
    XiaoMi,
}

impl ProviderKind {
    /// All supported providers, in registration order
    pub const ALL: [Self; 4] = [Self::Douban, Self::Taobao, Self::WeChat, Self::XiaoMi];

    /// Get the provider as a string (lowercase)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Douban => "douban",
            Self::Taobao => "taobao",
            Self::WeChat => "wechat",
            Self::XiaoMi => "xiaomi",
        }
    }

    /// Default authentication scheme name for the provider
    #[must_use]
    pub const fn default_scheme(&self) -> &'static str {
        match self {
            Self::Douban => "Douban",
            Self::Taobao => "Taobao",
            Self::WeChat => "WeChat",
            Self::XiaoMi => "XiaoMI",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "douban" => Ok(Self::Douban),
            "taobao" => Ok(Self::Taobao),
            "wechat" | "weixin" => Ok(Self::WeChat),
            "xiaomi" | "mi" => Ok(Self::XiaoMi),
            _ => Err(OAuthError::UnknownProvider(s.to_string())),
        }
    }
}

/// Options shared by every provider adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthOptions {
    /// Authentication scheme the resulting ticket is issued under
    pub authentication_scheme: String,
    /// OAuth2 client ID (WeChat: `appid`)
    pub client_id: String,
    /// OAuth2 client secret (WeChat: `secret`)
    pub client_secret: String,
    /// Authorization endpoint the user agent is redirected to
    pub authorization_endpoint: String,
    /// Token endpoint used for the code exchange
    pub token_endpoint: String,
    /// User information endpoint, if the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_information_endpoint: Option<String>,
    /// Scopes to request
    #[serde(default)]
    pub scope: Vec<String>,
    /// Path of the callback route, relative to the public origin
    pub callback_path: String,
    /// Issuer stamped on every claim; defaults to the scheme name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_issuer: Option<String>,
    /// Store the tokens in the ticket properties
    #[serde(default)]
    pub save_tokens: bool,
}

impl OAuthOptions {
    /// Issuer used for the claims of this scheme
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.claims_issuer
            .as_deref()
            .unwrap_or(&self.authentication_scheme)
    }

    /// Check that the mandatory options are present
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidOptions` naming the first missing option
    pub fn validate(&self) -> Result<(), OAuthError> {
        let required = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("authorization_endpoint", &self.authorization_endpoint),
            ("token_endpoint", &self.token_endpoint),
            ("callback_path", &self.callback_path),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(OAuthError::InvalidOptions(format!(
                    "{name} must be provided for scheme {}",
                    self.authentication_scheme
                )));
            }
        }
        if !self.callback_path.starts_with('/') {
            return Err(OAuthError::InvalidOptions(format!(
                "callback_path must start with '/': {}",
                self.callback_path
            )));
        }
        Ok(())
    }
}

/// Configuration for an OAuth2 provider
///
/// Only the client credentials are required; endpoints, scopes and the
/// callback path fall back to the provider defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// OAuth2 client ID
    #[serde(alias = "app_id", alias = "appid", deserialize_with = "string_or_number")]
    pub client_id: String,
    /// OAuth2 client secret
    #[serde(alias = "app_secret", alias = "secret", deserialize_with = "string_or_number")]
    pub client_secret: String,
    /// OAuth2 scopes to request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
    /// Authorization endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
    /// Token endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// User information endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_url: Option<String>,
    /// Callback path override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_path: Option<String>,
    /// Authentication scheme override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Claims issuer override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims_issuer: Option<String>,
    /// Save tokens in the ticket properties
    #[serde(default)]
    pub save_tokens: bool,
}

/// Numeric app keys arrive as numbers from environment variables
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
    })
}

/// Built-in endpoints and scopes of a provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults {
    /// Authorization endpoint
    pub authorization_endpoint: &'static str,
    /// Token endpoint
    pub token_endpoint: &'static str,
    /// User information endpoint
    pub user_information_endpoint: Option<&'static str>,
    /// Default scopes
    pub scope: &'static [&'static str],
}

impl ProviderConfig {
    /// Minimal configuration with client credentials
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Self::default()
        }
    }

    /// Resolve the options for `kind`, filling gaps from `defaults`
    #[must_use]
    pub fn to_options(&self, kind: ProviderKind, defaults: &ProviderDefaults) -> OAuthOptions {
        OAuthOptions {
            authentication_scheme: self
                .scheme
                .clone()
                .unwrap_or_else(|| kind.default_scheme().to_string()),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authorization_endpoint: self
                .auth_url
                .clone()
                .unwrap_or_else(|| defaults.authorization_endpoint.to_string()),
            token_endpoint: self
                .token_url
                .clone()
                .unwrap_or_else(|| defaults.token_endpoint.to_string()),
            user_information_endpoint: self
                .userinfo_url
                .clone()
                .or_else(|| defaults.user_information_endpoint.map(str::to_string)),
            scope: self.scopes.clone().unwrap_or_else(|| {
                defaults.scope.iter().map(|s| (*s).to_string()).collect()
            }),
            callback_path: self
                .callback_path
                .clone()
                .unwrap_or_else(|| format!("/auth/{}/callback", kind.as_str())),
            claims_issuer: self.claims_issuer.clone(),
            save_tokens: self.save_tokens,
        }
    }
}

/// Token endpoint response
///
/// Keeps the raw JSON so adapters can read provider-specific fields such as
/// `openid`, `taobao_user_id` or `mac_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokenResponse {
    /// Raw response body
    pub response: Value,
    /// Access token
    pub access_token: String,
    /// Token type (`bearer`, `mac`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Refresh token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime of the access token in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl OAuthTokenResponse {
    /// Build from a parsed token endpoint body
    #[must_use]
    pub fn from_json(response: Value) -> Self {
        let access_token = json_string(&response, "access_token").unwrap_or_default();
        let token_type = json_string(&response, "token_type");
        let refresh_token = json_string(&response, "refresh_token");
        let expires_in = json_string(&response, "expires_in").and_then(|s| s.parse().ok());

        Self {
            response,
            access_token,
            token_type,
            refresh_token,
            expires_in,
        }
    }

    /// Read a field of the raw response as a string
    #[must_use]
    pub fn value(&self, key: &str) -> Option<String> {
        json_string(&self.response, key)
    }
}

/// Read `key` from a JSON object as a string
///
/// Numbers and booleans are rendered as text, matching how providers mix
/// numeric and string identifiers. Missing, null and empty values yield `None`.
#[must_use]
pub fn json_string(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// OAuth2 errors
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Unknown provider
    #[error("Unknown OAuth2 provider: {0}")]
    UnknownProvider(String),

    /// Provider not configured
    #[error("OAuth2 provider not configured: {0}")]
    ProviderNotConfigured(ProviderKind),

    /// Options are missing or malformed
    #[error("Invalid OAuth2 options: {0}")]
    InvalidOptions(String),

    /// Invalid, tampered or expired state parameter
    #[error("Invalid or expired OAuth2 state")]
    InvalidState,

    /// The callback did not present the correlation nonce bound to the
    /// state, or the state was already used
    #[error("OAuth2 correlation failed")]
    CorrelationFailed,

    /// The callback carried no authorization code
    #[error("OAuth2 callback is missing the authorization code")]
    MissingCode,

    /// The provider redirected back with an error
    #[error("Remote authentication failed: {error}{}", describe(.description))]
    RemoteFailure {
        /// `error` query parameter
        error: String,
        /// `error_description` query parameter
        description: Option<String>,
    },

    /// Authorization code exchange failed
    #[error("Failed to exchange authorization code for token: {0}")]
    TokenExchangeFailed(String),

    /// Failed to fetch user info
    #[error("Failed to fetch user information: {0}")]
    UserInfoFailed(String),

    /// The provider answered with an application-level error body
    #[error("Provider returned error {code}: {message}")]
    ProviderError {
        /// Provider error code (`errcode`, `error`, ...)
        code: String,
        /// Provider error message
        message: String,
    },

    /// MAC algorithm not supported by the signer
    #[error("Unsupported MAC algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The ticket was rejected while being created
    #[error("Ticket rejected: {0}")]
    TicketRejected(String),

    /// Generic OAuth2 error
    #[error("OAuth2 error: {0}")]
    Generic(String),
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}
