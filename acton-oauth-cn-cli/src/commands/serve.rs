//! Sign-in server command

use std::net::SocketAddr;
use std::path::PathBuf;

use acton_oauth_cn::handlers::{router, AppState};
use acton_oauth_cn::observability;
use anyhow::{Context, Result};
use clap::Args;
use console::style;

use super::load_settings;

/// Serve the sign-in routes
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000", env = "ACTON_OAUTH_BIND")]
    pub bind: SocketAddr,

    /// Configuration file (defaults to `./config.toml`)
    #[arg(long, short, env = "ACTON_OAUTH_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ServeCommand {
    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        observability::init()?;

        let settings = load_settings(self.config.as_deref())?;
        let state = AppState::new(settings).context("Failed to build provider registry")?;

        let providers = state.registry().configured();
        if providers.is_empty() {
            tracing::warn!("no providers configured; every sign-in route will return 404");
        }

        let listener = tokio::net::TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind))?;

        println!(
            "{} {} ({} provider(s))",
            style("Listening on").green().bold(),
            style(format!("http://{}", self.bind)).cyan(),
            providers.len()
        );
        for kind in &providers {
            println!("  {} /auth/{kind}", style("→").dim());
        }

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
