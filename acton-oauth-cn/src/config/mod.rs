//! Configuration management for acton-oauth-cn
//!
//! Settings are loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `ACTON_OAUTH_` prefix, `__`
//!    for nesting)
//! 2. `./config.toml` or an explicit file
//! 3. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! public_origin = "https://app.example.com"
//! state_secret = "change-me"
//! state_lifetime_secs = 900
//! request_timeout_secs = 30
//!
//! [douban]
//! client_id = "0b5405e19c58e4cc21fc11a4d50aae64"
//! client_secret = "edfc4e395ef93375"
//!
//! [wechat]
//! app_id = "wx520c15f417810387"
//! app_secret = "..."
//!
//! [taobao]
//! client_id = "12345678"
//! client_secret = "..."
//! view = "wap"
//!
//! [xiaomi]
//! client_id = "2882303761517"
//! client_secret = "..."
//! token_type = "mac"
//! skip_confirm = true
//! ```
//!
//! The same value from the environment:
//! `ACTON_OAUTH_XIAOMI__TOKEN_TYPE=mac`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::oauth2::http::backchannel;
use crate::oauth2::state::DEFAULT_STATE_LIFETIME_SECS;
use crate::oauth2::types::{OAuthError, ProviderConfig, ProviderKind};
use crate::oauth2::{StateProtector, TaobaoConfig, XiaoMiConfig};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_OAUTH_";

/// Sign-in settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthSettings {
    /// Scheme, host and port the callback URLs are built on
    pub public_origin: String,

    /// Key used to sign the `state` parameter
    pub state_secret: String,

    /// Lifetime of a protected state in seconds
    pub state_lifetime_secs: u64,

    /// Timeout of backchannel requests in seconds
    pub request_timeout_secs: u64,

    /// Douban client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub douban: Option<ProviderConfig>,

    /// Taobao client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taobao: Option<TaobaoConfig>,

    /// WeChat client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wechat: Option<ProviderConfig>,

    /// XiaoMI client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xiaomi: Option<XiaoMiConfig>,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            public_origin: "http://localhost:3000".to_string(),
            state_secret: String::new(),
            state_lifetime_secs: DEFAULT_STATE_LIFETIME_SECS,
            request_timeout_secs: 30,
            douban: None,
            taobao: None,
            wechat: None,
            xiaomi: None,
        }
    }
}

impl OAuthSettings {
    /// Load settings from `./config.toml` and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default settings cannot be serialized to TOML
    /// - `./config.toml` contains invalid TOML syntax
    /// - Values fail type conversion
    pub fn load() -> anyhow::Result<Self> {
        let mut figment = Self::defaults()?;

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        let settings = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;
        Ok(settings)
    }

    /// Load settings from a specific file and the environment
    ///
    /// A missing file is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default settings cannot be serialized to TOML
    /// - The file contains invalid TOML syntax
    /// - Values fail type conversion
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings = Self::defaults()?
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;
        Ok(settings)
    }

    fn defaults() -> anyhow::Result<Figment> {
        Ok(Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?)))
    }

    /// Providers with a configuration section
    #[must_use]
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| match kind {
                ProviderKind::Douban => self.douban.is_some(),
                ProviderKind::Taobao => self.taobao.is_some(),
                ProviderKind::WeChat => self.wechat.is_some(),
                ProviderKind::XiaoMi => self.xiaomi.is_some(),
            })
            .collect()
    }

    /// Backchannel request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the shared backchannel HTTP client
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be built
    pub fn backchannel(&self) -> Result<reqwest::Client, OAuthError> {
        backchannel(self.request_timeout())
    }

    /// Build the state protector
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::InvalidOptions` if `state_secret` is empty
    pub fn state_protector(&self) -> Result<StateProtector, OAuthError> {
        StateProtector::new(self.state_secret.as_bytes(), self.state_lifetime_secs)
    }

    /// Absolute callback URL for a callback path
    #[must_use]
    pub fn callback_url(&self, callback_path: &str) -> String {
        format!("{}{callback_path}", self.public_origin.trim_end_matches('/'))
    }
}
