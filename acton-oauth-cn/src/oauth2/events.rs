//! Sign-in event hooks
//!
//! Applications observe or veto ticket creation by implementing
//! [`OAuthEvents`]. The hook runs after the provider claims are mapped and
//! before the ticket is returned.

use async_trait::async_trait;
use serde_json::Value;

use super::identity::{AuthenticationProperties, ClaimsIdentity};
use super::types::{OAuthError, OAuthTokenResponse, ProviderKind};

/// Context handed to [`OAuthEvents::creating_ticket`]
#[derive(Debug)]
pub struct CreatingTicketContext<'a> {
    /// Provider that authenticated the user
    pub provider: ProviderKind,
    /// Scheme the ticket is issued under
    pub scheme: &'a str,
    /// Identity being built; may receive extra claims
    pub identity: &'a mut ClaimsIdentity,
    /// Properties restored from the state parameter
    pub properties: &'a mut AuthenticationProperties,
    /// Token response
    pub tokens: &'a OAuthTokenResponse,
    /// Provider user payload the claims were mapped from
    pub user: &'a Value,
}

/// Hooks into the sign-in flow
#[async_trait]
pub trait OAuthEvents: Send + Sync {
    /// Called before the ticket is returned
    ///
    /// # Errors
    ///
    /// Returning an error aborts the sign-in with that error
    async fn creating_ticket(&self, _ctx: &mut CreatingTicketContext<'_>) -> Result<(), OAuthError> {
        Ok(())
    }
}

/// Event sink that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

#[async_trait]
impl OAuthEvents for NoopEvents {}
