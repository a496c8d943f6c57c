//! Challenge and callback driver
//!
//! [`OAuthFlow`] ties one provider adapter to the state protector and the
//! event hooks. It implements the two halves of the authorization code
//! flow: building the redirect to the provider, and turning the callback
//! into an [`AuthenticationTicket`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use reqwest::Url;
use serde::Deserialize;
use tracing::Instrument;

use super::events::{CreatingTicketContext, NoopEvents, OAuthEvents};
use super::handler::OAuthHandler;
use super::identity::{AuthenticationProperties, AuthenticationTicket, ClaimsIdentity};
use super::state::StateProtector;
use super::types::{OAuthError, OAuthOptions, ProviderKind};

/// Properties item holding the callback URL sent to the provider
pub const CALLBACK_URI_ITEM: &str = ".callback_uri";

/// Properties item holding the correlation nonce bound to the user agent
pub const CORRELATION_ITEM: &str = ".correlation";

/// Outcome of [`OAuthFlow::challenge`]
#[derive(Debug, Clone)]
pub struct Challenge {
    /// Authorization URL the user agent is redirected to
    pub url: Url,
    /// Nonce the user agent must present again on the callback
    pub correlation: String,
}

fn correlation_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Query parameters of the provider callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Protected state issued by [`OAuthFlow::challenge`]
    pub state: Option<String>,
    /// Error reported by the provider
    pub error: Option<String>,
    /// Human readable error description
    pub error_description: Option<String>,
    /// Correlation nonce presented by the user agent, usually from a cookie
    #[serde(skip)]
    pub correlation: Option<String>,
}

/// Authorization code flow for one provider
#[derive(Clone)]
pub struct OAuthFlow {
    handler: Arc<dyn OAuthHandler>,
    protector: StateProtector,
    events: Arc<dyn OAuthEvents>,
    consumed: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl std::fmt::Debug for OAuthFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthFlow")
            .field("handler", &self.handler)
            .field("protector", &self.protector)
            .finish_non_exhaustive()
    }
}

impl OAuthFlow {
    /// Create a flow with no event hooks
    #[must_use]
    pub fn new(handler: Arc<dyn OAuthHandler>, protector: StateProtector) -> Self {
        Self {
            handler,
            protector,
            events: Arc::new(NoopEvents),
            consumed: Arc::default(),
        }
    }

    /// Replace the event hooks
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn OAuthEvents>) -> Self {
        self.events = events;
        self
    }

    /// Provider served by this flow
    #[must_use]
    pub fn kind(&self) -> ProviderKind {
        self.handler.kind()
    }

    /// Provider options
    #[must_use]
    pub fn options(&self) -> &OAuthOptions {
        self.handler.options()
    }

    /// Provider adapter
    #[must_use]
    pub fn handler(&self) -> &dyn OAuthHandler {
        self.handler.as_ref()
    }

    /// Build the authorization URL
    ///
    /// `properties` are protected into the `state` parameter together with
    /// `redirect_uri`, so the callback can repeat the exact same value in
    /// the code exchange. The returned correlation nonce must be handed to
    /// the user agent (the router sets it as a cookie) and presented again
    /// in [`CallbackParams::correlation`].
    ///
    /// # Errors
    ///
    /// Returns error if the state cannot be protected or the authorization
    /// endpoint is invalid
    pub fn challenge(
        &self,
        mut properties: AuthenticationProperties,
        redirect_uri: &str,
    ) -> Result<Challenge, OAuthError> {
        let correlation = correlation_nonce();
        properties.set_item(CALLBACK_URI_ITEM, Some(redirect_uri.to_string()));
        properties.set_item(CORRELATION_ITEM, Some(correlation.clone()));
        let state = self.protector.protect(&properties)?;
        let url = self.handler.build_challenge_url(&state, redirect_uri)?;

        tracing::debug!(
            provider = %self.kind(),
            scheme = %self.options().authentication_scheme,
            "built authorization challenge"
        );
        Ok(Challenge { url, correlation })
    }

    /// Check the presented nonce against the state and mark it as used
    fn consume_correlation(
        &self,
        properties: &mut AuthenticationProperties,
        presented: Option<&str>,
    ) -> Result<(), OAuthError> {
        let expected = properties
            .get_item(CORRELATION_ITEM)
            .map(ToString::to_string)
            .ok_or(OAuthError::InvalidState)?;
        properties.set_item(CORRELATION_ITEM, None);

        if presented != Some(expected.as_str()) {
            tracing::warn!(
                presented = presented.is_some(),
                "correlation mismatch (potential CSRF attack)"
            );
            return Err(OAuthError::CorrelationFailed);
        }

        let now = Utc::now();
        let expires = properties
            .expires_utc
            .unwrap_or_else(|| now + Duration::hours(1));
        let mut consumed = self
            .consumed
            .lock()
            .map_err(|_| OAuthError::Generic("correlation store poisoned".to_string()))?;
        consumed.retain(|_, until| *until > now);
        if consumed.insert(expected, expires).is_some() {
            tracing::warn!("state replayed");
            return Err(OAuthError::CorrelationFailed);
        }
        Ok(())
    }

    /// Complete the flow from the provider callback
    ///
    /// # Errors
    ///
    /// - `RemoteFailure` if the provider reported an error
    /// - `InvalidState` if the state is missing, tampered or expired
    /// - `CorrelationFailed` if the correlation nonce does not match or the
    ///   state was already used
    /// - `MissingCode` if no authorization code was returned
    /// - `TokenExchangeFailed`, `UserInfoFailed` or `ProviderError` if the
    ///   provider calls fail
    /// - any error returned by [`OAuthEvents::creating_ticket`]
    pub async fn handle_callback(
        &self,
        params: CallbackParams,
    ) -> Result<AuthenticationTicket, OAuthError> {
        let span = tracing::info_span!(
            "oauth_callback",
            provider = %self.kind(),
            scheme = %self.options().authentication_scheme,
        );
        self.complete(params).instrument(span).await
    }

    async fn complete(&self, params: CallbackParams) -> Result<AuthenticationTicket, OAuthError> {
        if let Some(error) = params.error {
            tracing::warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or_default(),
                "provider reported an error"
            );
            return Err(OAuthError::RemoteFailure {
                error,
                description: params.error_description,
            });
        }

        let state = params.state.as_deref().ok_or(OAuthError::InvalidState)?;
        let mut properties = self.protector.unprotect(state)?;
        self.consume_correlation(&mut properties, params.correlation.as_deref())?;

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(OAuthError::MissingCode)?;

        let redirect_uri = properties
            .get_item(CALLBACK_URI_ITEM)
            .map(ToString::to_string)
            .ok_or(OAuthError::InvalidState)?;
        properties.set_item(CALLBACK_URI_ITEM, None);

        let tokens = self.handler.exchange_code(code, &redirect_uri).await?;
        if tokens.access_token.is_empty() {
            tracing::warn!("token response has no access token");
            return Err(OAuthError::TokenExchangeFailed(
                "Token response did not contain an access token".to_string(),
            ));
        }
        tracing::debug!(token_type = ?tokens.token_type, "exchanged authorization code");

        let options = self.options();
        let mut identity = ClaimsIdentity::new(options.authentication_scheme.clone());
        let user = self.handler.create_identity(&mut identity, &tokens).await?;

        if options.save_tokens {
            properties.store_tokens(&tokens);
        }

        let mut ctx = CreatingTicketContext {
            provider: self.kind(),
            scheme: &options.authentication_scheme,
            identity: &mut identity,
            properties: &mut properties,
            tokens: &tokens,
            user: &user,
        };
        self.events.creating_ticket(&mut ctx).await?;

        tracing::info!(
            user_id = identity.name_identifier().unwrap_or_default(),
            claims = identity.claims.len(),
            "user authenticated"
        );
        Ok(AuthenticationTicket::new(
            identity,
            properties,
            options.authentication_scheme.clone(),
        ))
    }
}
