//! OAuth2 sign-in for Chinese identity providers
//!
//! Each provider adapter implements [`OAuthHandler`]: it builds the
//! authorization URL, exchanges the authorization code, and maps the
//! provider's profile into a [`ClaimsIdentity`]. [`OAuthFlow`] drives an
//! adapter through a full sign-in, protecting the round-trip state with
//! [`StateProtector`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acton_oauth_cn::oauth2::{
//!     AuthenticationProperties, DoubanProvider, OAuthFlow, ProviderConfig, StateProtector,
//! };
//!
//! # fn example() -> Result<(), acton_oauth_cn::oauth2::OAuthError> {
//! let provider = DoubanProvider::new(
//!     &ProviderConfig::new("client-id", "client-secret"),
//!     reqwest::Client::new(),
//! )?;
//! let flow = OAuthFlow::new(Arc::new(provider), StateProtector::new("secret", 900)?);
//! let challenge = flow.challenge(
//!     AuthenticationProperties::with_redirect_uri("/"),
//!     "https://app.example.com/auth/douban/callback",
//! )?;
//! // Hand `challenge.correlation` to the browser, then redirect it
//! println!("{}", challenge.url);
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod flow;
pub mod handler;
pub mod http;
pub mod identity;
pub mod mac;
pub mod providers;
pub mod state;
pub mod types;

pub use events::{CreatingTicketContext, NoopEvents, OAuthEvents};
pub use flow::{CallbackParams, Challenge, OAuthFlow};
pub use handler::OAuthHandler;
pub use identity::{
    claim_types, AuthenticationProperties, AuthenticationTicket, Claim, ClaimsIdentity,
};
pub use mac::MacAlgorithm;
pub use providers::{
    BaseOAuthProvider, DoubanProvider, MiTokenType, TaobaoConfig, TaobaoProvider, TaobaoView,
    WeChatProvider, XiaoMiConfig, XiaoMiProvider,
};
pub use state::StateProtector;
pub use types::{OAuthError, OAuthOptions, OAuthTokenResponse, ProviderConfig, ProviderKind};
