//! OAuth2 provider implementations
//!
//! This module contains adapters for the supported Chinese identity providers:
//! - Douban
//! - Taobao (identity taken from the token response)
//! - WeChat Open Platform
//! - XiaoMI account (bearer or MAC tokens)
//!
//! All providers use a shared `BaseOAuthProvider` for the standard OAuth2 steps.

pub mod base;
pub mod douban;
pub mod taobao;
pub mod wechat;
pub mod xiaomi;

pub use base::BaseOAuthProvider;
pub use douban::DoubanProvider;
pub use taobao::{TaobaoConfig, TaobaoProvider, TaobaoView};
pub use wechat::WeChatProvider;
pub use xiaomi::{MiTokenType, XiaoMiConfig, XiaoMiProvider};
