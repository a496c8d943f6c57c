//! MAC signing command

use acton_oauth_cn::oauth2::mac::{self, DEFAULT_MAC_ALGORITHM};
use anyhow::{Context, Result};
use clap::Args;
use reqwest::{Method, Url};

/// Compute a XiaoMI `Authorization: MAC` header for a request
#[derive(Debug, Args)]
pub struct MacSignCommand {
    /// Request URL, including the query string
    pub url: String,

    /// Access token
    #[arg(long)]
    pub token: String,

    /// MAC key from the token response
    #[arg(long)]
    pub key: String,

    /// MAC algorithm
    #[arg(long, default_value = DEFAULT_MAC_ALGORITHM)]
    pub algorithm: String,

    /// HTTP method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Fixed nonce (`<random>:<minutes>`) instead of a fresh one
    #[arg(long)]
    pub nonce: Option<String>,
}

impl MacSignCommand {
    /// Execute the command
    pub fn execute(&self) -> Result<()> {
        println!("{}", self.render()?);
        Ok(())
    }

    /// Full header line
    pub fn render(&self) -> Result<String> {
        let url = Url::parse(&self.url).with_context(|| format!("Invalid URL: {}", self.url))?;
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid HTTP method: {}", self.method))?;
        let nonce = self.nonce.clone().unwrap_or_else(mac::nonce);

        let header = mac::authorization_header_with_nonce(
            &self.token,
            &self.key,
            &self.algorithm,
            &method,
            &url,
            &nonce,
        )?;
        Ok(format!("Authorization: MAC {header}"))
    }
}
