//! Tamper-proof `state` parameter
//!
//! The authentication properties travel to the provider and back inside the
//! OAuth2 `state` parameter. They are serialized to JSON and signed with
//! HMAC-SHA256, so the callback can restore them without server-side storage.
//!
//! Format: `base64url(json) "." base64url(hmac)`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::identity::AuthenticationProperties;
use super::types::OAuthError;

type HmacSha256 = Hmac<Sha256>;

/// Default lifetime of a protected state (15 minutes)
pub const DEFAULT_STATE_LIFETIME_SECS: u64 = 900;

/// Signs and verifies the `state` parameter
#[derive(Clone)]
pub struct StateProtector {
    secret: Vec<u8>,
    lifetime: Duration,
}

impl std::fmt::Debug for StateProtector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateProtector")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl StateProtector {
    /// Create a protector keyed with `secret`
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidOptions` if the secret is empty
    pub fn new(secret: impl AsRef<[u8]>, lifetime_secs: u64) -> Result<Self, OAuthError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(OAuthError::InvalidOptions(
                "state secret must not be empty".to_string(),
            ));
        }
        let lifetime = i64::try_from(lifetime_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                OAuthError::InvalidOptions(format!("state lifetime too large: {lifetime_secs}"))
            })?;

        Ok(Self {
            secret: secret.to_vec(),
            lifetime,
        })
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.secret)
            .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"))
    }

    /// Stamp and sign the properties
    ///
    /// # Errors
    ///
    /// Returns error if the properties cannot be serialized
    pub fn protect(&self, properties: &AuthenticationProperties) -> Result<String, OAuthError> {
        let now = Utc::now();
        let mut stamped = properties.clone();
        stamped.issued_utc = Some(now);
        stamped.expires_utc = Some(now + self.lifetime);

        let payload = serde_json::to_vec(&stamped)
            .map_err(|e| OAuthError::Generic(format!("Failed to serialize state: {e}")))?;

        let mut mac = self.mac();
        mac.update(&payload);
        let tag = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        ))
    }

    /// Verify and restore the properties
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidState` if the state is malformed, was
    /// tampered with, or has expired
    pub fn unprotect(&self, protected: &str) -> Result<AuthenticationProperties, OAuthError> {
        let (payload, tag) = protected.split_once('.').ok_or(OAuthError::InvalidState)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| OAuthError::InvalidState)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| OAuthError::InvalidState)?;

        let mut mac = self.mac();
        mac.update(&payload);
        mac.verify_slice(&tag).map_err(|_| {
            tracing::warn!("OAuth2 state signature mismatch");
            OAuthError::InvalidState
        })?;

        let properties: AuthenticationProperties =
            serde_json::from_slice(&payload).map_err(|_| OAuthError::InvalidState)?;

        if properties.is_expired_at(Utc::now()) {
            tracing::debug!("OAuth2 state expired");
            return Err(OAuthError::InvalidState);
        }

        Ok(properties)
    }
}
