//! Provider registry
//!
//! Builds one [`OAuthFlow`] per configured provider. All flows share the
//! backchannel client and the state protector.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::OAuthSettings;
use crate::oauth2::{
    DoubanProvider, NoopEvents, OAuthError, OAuthEvents, OAuthFlow, OAuthHandler, ProviderKind,
    TaobaoProvider, WeChatProvider, XiaoMiProvider,
};

/// Configured sign-in flows, keyed by provider
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    flows: HashMap<ProviderKind, OAuthFlow>,
}

impl ProviderRegistry {
    /// Build flows for every provider section in `settings`
    ///
    /// # Errors
    ///
    /// Returns error if the state secret is empty, the HTTP client cannot be
    /// built, or a provider section is invalid
    pub fn from_settings(settings: &OAuthSettings) -> Result<Self, OAuthError> {
        Self::from_settings_with_events(settings, Arc::new(NoopEvents))
    }

    /// Build flows sharing one event sink
    ///
    /// # Errors
    ///
    /// See [`ProviderRegistry::from_settings`]
    pub fn from_settings_with_events(
        settings: &OAuthSettings,
        events: Arc<dyn OAuthEvents>,
    ) -> Result<Self, OAuthError> {
        let client = settings.backchannel()?;
        let protector = settings.state_protector()?;
        let mut registry = Self::default();

        let mut handlers: Vec<Arc<dyn OAuthHandler>> = Vec::new();
        if let Some(config) = &settings.douban {
            handlers.push(Arc::new(DoubanProvider::new(config, client.clone())?));
        }
        if let Some(config) = &settings.taobao {
            handlers.push(Arc::new(TaobaoProvider::new(config, client.clone())?));
        }
        if let Some(config) = &settings.wechat {
            handlers.push(Arc::new(WeChatProvider::new(config, client.clone())?));
        }
        if let Some(config) = &settings.xiaomi {
            handlers.push(Arc::new(XiaoMiProvider::new(config, client.clone())?));
        }

        for handler in handlers {
            tracing::info!(
                provider = %handler.kind(),
                scheme = %handler.options().authentication_scheme,
                callback_path = %handler.options().callback_path,
                "registered OAuth2 provider"
            );
            registry.insert(OAuthFlow::new(handler, protector.clone()).with_events(events.clone()));
        }

        Ok(registry)
    }

    /// Add or replace the flow for its provider
    pub fn insert(&mut self, flow: OAuthFlow) {
        self.flows.insert(flow.kind(), flow);
    }

    /// Flow for `kind`
    ///
    /// # Errors
    ///
    /// Returns `OAuthError::ProviderNotConfigured` if the provider has no flow
    pub fn flow(&self, kind: ProviderKind) -> Result<&OAuthFlow, OAuthError> {
        self.flows
            .get(&kind)
            .ok_or(OAuthError::ProviderNotConfigured(kind))
    }

    /// Configured providers, in [`ProviderKind::ALL`] order
    #[must_use]
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.flows.contains_key(kind))
            .collect()
    }
}
