//! acton-oauth-cn CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use acton_oauth_cn_cli_lib::{AuthorizeUrlCommand, MacSignCommand, ServeCommand};
use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "acton-oauth-cn")]
#[command(version)]
#[command(about = "OAuth2 sign-in tooling for Douban, Taobao, WeChat and XiaoMI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the authorization URL of a configured provider
    AuthorizeUrl(AuthorizeUrlCommand),
    /// Compute a XiaoMI MAC authorization header
    MacSign(MacSignCommand),
    /// Serve the sign-in routes
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::AuthorizeUrl(cmd) => cmd.execute()?,
        Commands::MacSign(cmd) => cmd.execute()?,
        Commands::Serve(cmd) => cmd.execute().await?,
    }

    Ok(())
}
