//! Provider router selecting exactly one delivery channel.
//!
//! Selection is by completeness in fixed priority order
//! (EmailJS → Web3Forms → custom API). The chosen adapter is invoked once
//! per submission; a failure is final and never falls through to the next
//! channel.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::ContactConfig;
use crate::validation::FieldLimits;

use super::custom_api::CustomApiAdapter;
use super::emailjs::{EmailJsAdapter, EmailJsSettings, HttpRelayResolver, RelayResolver};
use super::web3forms::Web3FormsAdapter;
use super::{
    Channel, ConfigurationError, DeliveryAdapter, DeliveryError, DeliveryReceipt,
    ProviderConfig, Submission,
};

/// Routes submissions to the active channel, if any.
#[derive(Clone, Default)]
pub struct ProviderRouter {
    adapter: Option<Arc<dyn DeliveryAdapter>>,
}

impl std::fmt::Debug for ProviderRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRouter")
            .field("channel", &self.active_channel())
            .finish()
    }
}

impl ProviderRouter {
    /// Build a router from configuration using the HTTP EmailJS relay.
    pub fn from_config(config: &ContactConfig) -> Self {
        Self::from_config_with_resolver(config, Arc::new(HttpRelayResolver::default()))
    }

    /// Build a router from configuration with a custom EmailJS resolver.
    pub fn from_config_with_resolver(
        config: &ContactConfig,
        resolver: Arc<dyn RelayResolver>,
    ) -> Self {
        let Some(provider) = ProviderConfig::select(&config.channels) else {
            info!("no delivery channel configured");
            return Self::unconfigured();
        };
        info!(channel = %provider.channel(), "delivery channel selected");
        Self::with_adapter(instantiate_adapter(provider, &config.recipient_name, resolver))
    }

    /// Router with no active channel.
    pub fn unconfigured() -> Self {
        Self { adapter: None }
    }

    /// Router backed by a single adapter.
    pub fn with_adapter(adapter: Arc<dyn DeliveryAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
        }
    }

    /// Channel submissions will go through.
    pub fn active_channel(&self) -> Option<Channel> {
        self.adapter.as_ref().map(|a| a.channel())
    }

    /// Extra caps imposed by the active channel.
    pub fn field_limits(&self) -> Option<FieldLimits> {
        self.adapter.as_ref().and_then(|a| a.field_limits())
    }

    /// Deliver through the active channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NotConfigured`] without touching the
    /// network when no channel is active, otherwise whatever the adapter
    /// reports.
    pub async fn submit(&self, submission: &Submission) -> Result<DeliveryReceipt, DeliveryError> {
        let adapter = self
            .adapter
            .as_ref()
            .ok_or(ConfigurationError::NotConfigured)?;

        let channel = adapter.channel();
        let result = adapter.deliver(submission).await;
        match &result {
            Ok(_) => info!(channel = %channel, "message delivered"),
            Err(e) => error!(channel = %channel, error = %e, "message delivery failed"),
        }
        result
    }
}

fn instantiate_adapter(
    provider: ProviderConfig,
    recipient_name: &str,
    resolver: Arc<dyn RelayResolver>,
) -> Arc<dyn DeliveryAdapter> {
    match provider {
        ProviderConfig::EmailJs {
            service_id,
            template_id,
            public_key,
        } => Arc::new(EmailJsAdapter::new(
            EmailJsSettings {
                service_id,
                template_id,
                public_key,
                recipient_name: recipient_name.to_owned(),
            },
            resolver,
        )),
        ProviderConfig::Web3Forms { access_key } => Arc::new(Web3FormsAdapter::new(access_key)),
        ProviderConfig::CustomApi { endpoint_url } => {
            Arc::new(CustomApiAdapter::new(endpoint_url))
        }
    }
}
