//! Authorization URL command

use std::path::PathBuf;

use acton_oauth_cn::config::OAuthSettings;
use acton_oauth_cn::handlers::correlation_cookie_name;
use acton_oauth_cn::oauth2::{AuthenticationProperties, Challenge, ProviderKind};
use acton_oauth_cn::registry::ProviderRegistry;
use anyhow::{Context, Result};
use clap::Args;
use console::style;

use super::load_settings;

/// Print the authorization URL of a configured provider
#[derive(Debug, Args)]
pub struct AuthorizeUrlCommand {
    /// Provider (`douban`, `taobao`, `wechat`, `xiaomi`)
    pub provider: String,

    /// Local path to return to after sign-in
    #[arg(long)]
    pub return_url: Option<String>,

    /// Configuration file (defaults to `./config.toml`)
    #[arg(long, short, env = "ACTON_OAUTH_CONFIG")]
    pub config: Option<PathBuf>,
}

impl AuthorizeUrlCommand {
    /// Execute the command
    pub fn execute(&self) -> Result<()> {
        let settings = load_settings(self.config.as_deref())?;
        let kind: ProviderKind = self.provider.parse()?;
        let challenge = self.render(&settings)?;

        eprintln!(
            "{} {}",
            style("Authorization URL for").green().bold(),
            style(kind).cyan().bold()
        );
        println!("{}", challenge.url);
        eprintln!(
            "{} {}={}",
            style("Callback requires cookie").dim(),
            correlation_cookie_name(kind),
            challenge.correlation
        );
        Ok(())
    }

    /// Build the authorization challenge from `settings`
    pub fn render(&self, settings: &OAuthSettings) -> Result<Challenge> {
        let kind: ProviderKind = self.provider.parse()?;
        let registry =
            ProviderRegistry::from_settings(settings).context("Invalid provider configuration")?;
        let flow = registry.flow(kind)?;

        let properties = self
            .return_url
            .clone()
            .map(AuthenticationProperties::with_redirect_uri)
            .unwrap_or_default();
        let redirect_uri = settings.callback_url(&flow.options().callback_path);
        Ok(flow.challenge(properties, &redirect_uri)?)
    }
}
