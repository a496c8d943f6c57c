//! acton-oauth-cn: OAuth2 sign-in for Douban, Taobao, WeChat and XiaoMI
//!
//! Each provider speaks its own dialect of OAuth2. This crate hides the
//! differences behind one adapter trait and turns a successful sign-in into
//! a claims identity.
//!
//! | Provider | Quirks |
//! |----------|--------|
//! | Douban   | comma-separated scopes, bearer profile call |
//! | Taobao   | identity taken from the token response, `view` parameter |
//! | WeChat   | `appid`/`secret`, GET token exchange, `errcode` bodies, `#wechat_redirect` |
//! | XiaoMI   | `&&&START&&&` token prefix, MAC-signed profile call, `skip_confirm` |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use acton_oauth_cn::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     observability::init()?;
//!
//!     let settings = OAuthSettings::load()?;
//!     let app = router(AppState::new(settings)?);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! The flow can also be driven without axum through [`oauth2::OAuthFlow`].

// Lint configuration is handled at the workspace level in Cargo.toml

pub mod config;
pub mod error;
pub mod handlers;
pub mod oauth2;
pub mod observability;
pub mod registry;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use acton_oauth_cn::prelude::*;
    //! ```

    // Sign-in flow
    pub use crate::oauth2::{
        AuthenticationProperties, AuthenticationTicket, CallbackParams, Claim, ClaimsIdentity,
        CreatingTicketContext, OAuthError, OAuthEvents, OAuthFlow, OAuthHandler, ProviderConfig,
        ProviderKind, StateProtector,
    };

    // Providers
    pub use crate::oauth2::{
        DoubanProvider, MiTokenType, TaobaoConfig, TaobaoProvider, TaobaoView, WeChatProvider,
        XiaoMiConfig, XiaoMiProvider,
    };

    // Application wiring
    pub use crate::config::OAuthSettings;
    pub use crate::error::ServiceError;
    pub use crate::handlers::{router, AppState};
    pub use crate::observability;
    pub use crate::registry::ProviderRegistry;

    // Re-export key dependencies
    pub use axum;
}
