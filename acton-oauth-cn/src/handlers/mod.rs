//! OAuth2 HTTP handlers
//!
//! Axum routes for the sign-in flow:
//! - `GET /auth/providers` lists the configured providers
//! - `GET /auth/{provider}` redirects to the provider
//! - `GET /auth/{provider}/callback` completes the flow
//!
//! The challenge binds its `state` to the browser with an HttpOnly
//! correlation cookie scoped to the callback path. The callback requires the
//! cookie and always clears it.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use acton_oauth_cn::{config::OAuthSettings, handlers};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = OAuthSettings::load()?;
//! let app = handlers::router(handlers::AppState::new(settings)?);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::config::OAuthSettings;
use crate::error::ServiceError;
use crate::oauth2::{
    AuthenticationProperties, AuthenticationTicket, CallbackParams, OAuthError, OAuthFlow,
    ProviderKind,
};
use crate::registry::ProviderRegistry;

/// Shared state of the sign-in routes
#[derive(Debug, Clone)]
pub struct AppState {
    settings: Arc<OAuthSettings>,
    registry: Arc<ProviderRegistry>,
}

impl AppState {
    /// Build the registry from `settings`
    ///
    /// # Errors
    ///
    /// Returns error if the registry cannot be built
    pub fn new(settings: OAuthSettings) -> Result<Self, OAuthError> {
        let registry = ProviderRegistry::from_settings(&settings)?;
        Ok(Self::with_registry(settings, registry))
    }

    /// Use a prebuilt registry
    #[must_use]
    pub fn with_registry(settings: OAuthSettings, registry: ProviderRegistry) -> Self {
        Self {
            settings: Arc::new(settings),
            registry: Arc::new(registry),
        }
    }

    /// Sign-in settings
    #[must_use]
    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Provider registry
    #[must_use]
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn flow(&self, provider: &str) -> Result<&OAuthFlow, OAuthError> {
        let kind: ProviderKind = provider.parse()?;
        self.registry.flow(kind)
    }

    fn callback_url(&self, flow: &OAuthFlow) -> String {
        self.settings.callback_url(&flow.options().callback_path)
    }

    fn secure_cookies(&self) -> bool {
        self.settings.public_origin.starts_with("https://")
    }

    fn correlation_cookie(&self, flow: &OAuthFlow, value: String) -> Cookie<'static> {
        Cookie::build((correlation_cookie_name(flow.kind()), value))
            .path(flow.options().callback_path.clone())
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies())
            .build()
    }
}

/// Name of the correlation cookie of `kind`
#[must_use]
pub fn correlation_cookie_name(kind: ProviderKind) -> String {
    format!("acton_oauth_correlation_{kind}")
}

/// Build the sign-in router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/providers", get(list_providers))
        .route("/auth/{provider}", get(challenge))
        .route("/auth/{provider}/callback", get(callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Query parameters of the challenge route
#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    /// Local path to return to after sign-in
    pub return_url: Option<String>,
}

/// Provider listing entry
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Provider name used in routes
    pub provider: String,
    /// Authentication scheme
    pub scheme: String,
    /// Route that starts the sign-in
    pub login_path: String,
}

/// Claim as rendered in the callback response
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimView {
    /// Claim type
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claim value
    pub value: String,
    /// Claim issuer
    pub issuer: String,
}

/// Signed-in user as rendered in the callback response
#[derive(Debug, Serialize, Deserialize)]
pub struct TicketView {
    /// Scheme that issued the ticket
    pub scheme: String,
    /// Provider user id
    pub name_identifier: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// All claims
    pub claims: Vec<ClaimView>,
}

impl From<&AuthenticationTicket> for TicketView {
    fn from(ticket: &AuthenticationTicket) -> Self {
        Self {
            scheme: ticket.authentication_scheme.clone(),
            name_identifier: ticket.principal.name_identifier().map(str::to_string),
            name: ticket.principal.name().map(str::to_string),
            claims: ticket
                .principal
                .claims
                .iter()
                .map(|c| ClaimView {
                    claim_type: c.claim_type.clone(),
                    value: c.value.clone(),
                    issuer: c.issuer.clone(),
                })
                .collect(),
        }
    }
}

/// Only same-site absolute paths are accepted as return URLs
fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}

/// List configured providers
pub async fn list_providers(State(state): State<AppState>) -> Json<Vec<ProviderInfo>> {
    let providers = state
        .registry
        .configured()
        .into_iter()
        .filter_map(|kind| state.registry.flow(kind).ok())
        .map(|flow| ProviderInfo {
            provider: flow.kind().to_string(),
            scheme: flow.options().authentication_scheme.clone(),
            login_path: format!("/auth/{}", flow.kind()),
        })
        .collect();
    Json(providers)
}

/// Redirect the user agent to the provider
///
/// # Errors
///
/// Returns error if the provider is unknown or not configured, or the
/// return URL is not a local path
pub async fn challenge(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<ChallengeQuery>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ServiceError> {
    let flow = state.flow(&provider)?;

    let properties = match query.return_url {
        Some(url) if is_local_path(&url) => AuthenticationProperties::with_redirect_uri(url),
        Some(url) => {
            return Err(ServiceError::BadRequest(format!(
                "return_url must be a local path: {url}"
            )))
        }
        None => AuthenticationProperties::default(),
    };

    let challenge = flow.challenge(properties, &state.callback_url(flow))?;
    let jar = jar.add(state.correlation_cookie(flow, challenge.correlation));
    tracing::info!(provider = %flow.kind(), "redirecting to provider");
    Ok((jar, Redirect::to(challenge.url.as_str())))
}

/// Complete the sign-in
///
/// Redirects to the stored return URL, or renders the signed-in user as JSON.
/// Fails when the callback is rejected or a provider call fails. The
/// correlation cookie is cleared either way.
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    jar: CookieJar,
) -> (CookieJar, Result<Response, ServiceError>) {
    let flow = match state.flow(&provider) {
        Ok(flow) => flow,
        Err(e) => return (jar, Err(e.into())),
    };

    let name = correlation_cookie_name(flow.kind());
    let correlation = jar.get(&name).map(|c| c.value().to_string());
    let jar = jar.remove(state.correlation_cookie(flow, String::new()));

    let params = CallbackParams {
        correlation,
        ..params
    };
    (jar, complete_sign_in(flow, params).await)
}

async fn complete_sign_in(
    flow: &OAuthFlow,
    params: CallbackParams,
) -> Result<Response, ServiceError> {
    let ticket = flow.handle_callback(params).await?;

    match ticket.properties.redirect_uri.as_deref() {
        Some(url) if is_local_path(url) => Ok(Redirect::to(url).into_response()),
        _ => Ok(Json(TicketView::from(&ticket)).into_response()),
    }
}
