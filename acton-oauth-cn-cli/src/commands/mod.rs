//! CLI command implementations

pub mod authorize_url;
pub mod mac_sign;
pub mod serve;

pub use authorize_url::AuthorizeUrlCommand;
pub use mac_sign::MacSignCommand;
pub use serve::ServeCommand;

use std::path::Path;

use acton_oauth_cn::config::OAuthSettings;
use anyhow::{Context, Result};

/// Load settings from `path`, or from `./config.toml` when absent
pub(crate) fn load_settings(path: Option<&Path>) -> Result<OAuthSettings> {
    match path {
        Some(path) => OAuthSettings::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => OAuthSettings::load().context("Failed to load configuration"),
    }
}
