//! Base OAuth2 provider implementation with shared logic
//!
//! This module provides `BaseOAuthProvider` which contains the standard
//! OAuth2 steps shared by Douban, Taobao, WeChat and XiaoMI. Adapters call
//! into it for the parts of the protocol they do not customize.

use reqwest::Url;
use serde_json::Value;

use crate::oauth2::http::read_json;
use crate::oauth2::types::{OAuthError, OAuthOptions, OAuthTokenResponse, ProviderKind};

/// Base OAuth2 provider containing shared logic for all providers
#[derive(Debug, Clone)]
pub struct BaseOAuthProvider {
    kind: ProviderKind,
    options: OAuthOptions,
    /// Reusable HTTP client for token and userinfo requests
    http_client: reqwest::Client,
}

impl BaseOAuthProvider {
    /// Create a new base OAuth2 provider
    ///
    /// # Arguments
    ///
    /// * `kind` - Provider this base serves
    /// * `options` - Client credentials and endpoints
    /// * `http_client` - Shared backchannel client
    ///
    /// # Errors
    ///
    /// Returns error if the options are incomplete or an endpoint is not a URL
    pub fn new(
        kind: ProviderKind,
        options: OAuthOptions,
        http_client: reqwest::Client,
    ) -> Result<Self, OAuthError> {
        options.validate()?;
        for endpoint in [
            Some(&options.authorization_endpoint),
            Some(&options.token_endpoint),
            options.user_information_endpoint.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            Url::parse(endpoint)
                .map_err(|e| OAuthError::InvalidOptions(format!("Invalid endpoint {endpoint}: {e}")))?;
        }

        Ok(Self {
            kind,
            options,
            http_client,
        })
    }

    /// Provider this base serves
    #[must_use]
    pub const fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Provider options
    #[must_use]
    pub const fn options(&self) -> &OAuthOptions {
        &self.options
    }

    /// Get reference to the HTTP client
    #[must_use]
    pub const fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Build an URL from an endpoint and query parameters
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not a valid URL
    pub fn endpoint_url(endpoint: &str, params: &[(&str, &str)]) -> Result<Url, OAuthError> {
        Url::parse_with_params(endpoint, params)
            .map_err(|e| OAuthError::InvalidOptions(format!("Invalid endpoint {endpoint}: {e}")))
    }

    /// User information endpoint, required by providers that call it
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidOptions` if the endpoint is not configured
    pub fn user_information_endpoint(&self) -> Result<&str, OAuthError> {
        self.options
            .user_information_endpoint
            .as_deref()
            .ok_or_else(|| {
                OAuthError::InvalidOptions(format!(
                    "user_information_endpoint must be provided for scheme {}",
                    self.options.authentication_scheme
                ))
            })
    }

    /// Standard authorization URL
    ///
    /// `client_id`, `scope`, `response_type=code`, `redirect_uri` and `state`
    /// on the authorization endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the authorization endpoint is invalid
    pub fn standard_challenge_url(
        &self,
        scope: &str,
        state: &str,
        redirect_uri: &str,
    ) -> Result<Url, OAuthError> {
        Self::endpoint_url(
            &self.options.authorization_endpoint,
            &[
                ("client_id", self.options.client_id.as_str()),
                ("scope", scope),
                ("response_type", "code"),
                ("redirect_uri", redirect_uri),
                ("state", state),
            ],
        )
    }

    /// Exchange an authorization code with a form POST
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from callback
    /// * `redirect_uri` - Redirect URI sent in the authorization request
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, the status is not a success, or
    /// the body is not JSON
    pub async fn exchange_code_form(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        let form = [
            ("client_id", self.options.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("client_secret", self.options.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http_client
            .post(&self.options.token_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchangeFailed(e.to_string()))?;

        let payload = read_json(response, OAuthError::TokenExchangeFailed).await?;
        Ok(OAuthTokenResponse::from_json(payload))
    }

    /// Fetch user info JSON with a bearer token
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP request fails or returns non-success status
    pub async fn fetch_user_info_bearer(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<Value, OAuthError> {
        let request = self.http_client.get(url).bearer_auth(access_token);
        Self::send_for_user_info(request).await
    }

    /// Send a prepared user information request and parse the JSON body
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP request fails or returns non-success status
    pub async fn send_for_user_info(request: reqwest::RequestBuilder) -> Result<Value, OAuthError> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFailed(e.to_string()))?;

        read_json(response, OAuthError::UserInfoFailed).await
    }
}
