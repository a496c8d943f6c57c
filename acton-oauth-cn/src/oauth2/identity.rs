//! Claims identity, authentication properties and tickets
//!
//! These are the host-side contracts every provider adapter populates: a
//! claims identity describing the signed-in user, a properties bag carried
//! through the provider round-trip, and the ticket combining both.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::types::OAuthTokenResponse;

/// Well-known claim types
pub mod claim_types {
    /// Unique identifier of the subject at the issuer
    pub const NAME_IDENTIFIER: &str =
        "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
    /// Display name of the subject
    pub const NAME: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
}

/// Well-known claim value types
pub mod claim_value_types {
    /// Plain string value
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
}

/// A single assertion about the authenticated user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type URI or `urn:` name
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claim value
    pub value: String,
    /// Value type URI
    pub value_type: String,
    /// Issuer of the claim
    pub issuer: String,
}

impl Claim {
    /// Create a string-valued claim
    pub fn new(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: claim_value_types::STRING.to_string(),
            issuer: issuer.into(),
        }
    }
}

/// Identity built from provider data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsIdentity {
    /// Scheme that authenticated this identity; `None` means anonymous
    pub authentication_type: Option<String>,
    /// Claims in insertion order
    pub claims: Vec<Claim>,
}

impl ClaimsIdentity {
    /// Create an empty identity for an authentication scheme
    pub fn new(authentication_type: impl Into<String>) -> Self {
        Self {
            authentication_type: Some(authentication_type.into()),
            claims: Vec::new(),
        }
    }

    /// Add a claim
    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Add a string claim, skipping missing or empty values
    ///
    /// Returns whether a claim was added.
    pub fn add_string_claim(
        &mut self,
        claim_type: &str,
        value: Option<&str>,
        issuer: &str,
    ) -> bool {
        match value {
            Some(value) if !value.is_empty() => {
                self.add_claim(Claim::new(claim_type, value, issuer));
                true
            }
            _ => false,
        }
    }

    /// First claim of the given type
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    /// Value of the first claim of the given type
    #[must_use]
    pub fn value_of(&self, claim_type: &str) -> Option<&str> {
        self.find_first(claim_type).map(|c| c.value.as_str())
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.value_of(claim_types::NAME)
    }

    /// Provider user identifier
    #[must_use]
    pub fn name_identifier(&self) -> Option<&str> {
        self.value_of(claim_types::NAME_IDENTIFIER)
    }

    /// Whether the identity was produced by an authentication scheme
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authentication_type
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }
}

/// Prefix of the property items holding saved tokens
const TOKEN_KEY_PREFIX: &str = ".Token.";
/// Property item listing the saved token names
const TOKEN_NAMES_KEY: &str = ".TokenNames";

/// State carried through the provider round-trip
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationProperties {
    /// Free-form items
    #[serde(default)]
    pub items: BTreeMap<String, String>,
    /// Where to send the user once sign-in completes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// When the properties were issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_utc: Option<DateTime<Utc>>,
    /// When the properties stop being valid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_utc: Option<DateTime<Utc>>,
}

impl AuthenticationProperties {
    /// Properties redirecting to `redirect_uri` after sign-in
    pub fn with_redirect_uri(redirect_uri: impl Into<String>) -> Self {
        Self {
            redirect_uri: Some(redirect_uri.into()),
            ..Self::default()
        }
    }

    /// Get an item
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Set an item; `None` removes it
    pub fn set_item(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match value {
            Some(value) => {
                self.items.insert(key, value);
            }
            None => {
                self.items.remove(&key);
            }
        }
    }

    /// Whether the properties have expired at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_utc.is_some_and(|expires| now > expires)
    }

    /// Save the tokens of a token response into the items
    pub fn store_tokens(&mut self, tokens: &OAuthTokenResponse) {
        let mut saved = vec![("access_token", Some(tokens.access_token.clone()))];
        saved.push(("refresh_token", tokens.refresh_token.clone()));
        saved.push(("token_type", tokens.token_type.clone()));
        saved.push((
            "expires_at",
            tokens
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                .map(|at| at.to_rfc3339()),
        ));

        let mut names = Vec::new();
        for (name, value) in saved {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                self.items.insert(format!("{TOKEN_KEY_PREFIX}{name}"), value);
                names.push(name);
            }
        }
        self.items
            .insert(TOKEN_NAMES_KEY.to_string(), names.join(";"));
    }

    /// Read a saved token
    #[must_use]
    pub fn token(&self, name: &str) -> Option<&str> {
        self.get_item(&format!("{TOKEN_KEY_PREFIX}{name}"))
    }
}

/// Result of a successful remote sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationTicket {
    /// Authenticated identity
    pub principal: ClaimsIdentity,
    /// Properties restored from the round-trip
    pub properties: AuthenticationProperties,
    /// Scheme that issued the ticket
    pub authentication_scheme: String,
}

impl AuthenticationTicket {
    /// Create a ticket
    pub fn new(
        principal: ClaimsIdentity,
        properties: AuthenticationProperties,
        authentication_scheme: impl Into<String>,
    ) -> Self {
        Self {
            principal,
            properties,
            authentication_scheme: authentication_scheme.into(),
        }
    }
}
