//! Provider adapter template
//!
//! [`OAuthHandler`] captures the four steps every provider goes through.
//! The default methods implement plain OAuth2 on top of
//! [`BaseOAuthProvider`]; adapters override only the steps their provider
//! does differently.

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use super::identity::ClaimsIdentity;
use super::providers::BaseOAuthProvider;
use super::types::{OAuthError, OAuthOptions, OAuthTokenResponse, ProviderKind};

/// A provider adapter
#[async_trait]
pub trait OAuthHandler: Send + Sync + std::fmt::Debug {
    /// Shared provider state
    fn base(&self) -> &BaseOAuthProvider;

    /// Provider this handler serves
    fn kind(&self) -> ProviderKind {
        self.base().kind()
    }

    /// Provider options
    fn options(&self) -> &OAuthOptions {
        self.base().options()
    }

    /// Scope parameter value; space separated by default
    fn format_scope(&self) -> String {
        self.options().scope.join(" ")
    }

    /// Authorization URL the user agent is sent to
    ///
    /// # Errors
    ///
    /// Returns error if the authorization endpoint is invalid
    fn build_challenge_url(&self, state: &str, redirect_uri: &str) -> Result<Url, OAuthError> {
        self.base()
            .standard_challenge_url(&self.format_scope(), state, redirect_uri)
    }

    /// Exchange the authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns error if the token endpoint rejects the code
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthTokenResponse, OAuthError> {
        self.base().exchange_code_form(code, redirect_uri).await
    }

    /// Map provider data into `identity`
    ///
    /// Returns the user payload the claims were read from.
    ///
    /// # Errors
    ///
    /// Returns error if the profile cannot be fetched
    async fn create_identity(
        &self,
        identity: &mut ClaimsIdentity,
        tokens: &OAuthTokenResponse,
    ) -> Result<Value, OAuthError>;
}
