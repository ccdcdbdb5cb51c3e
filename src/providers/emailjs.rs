//! EmailJS channel.
//!
//! The relay client is resolved on demand through a [`RelayResolver`] so a
//! host can swap or omit it. A resolver failure surfaces as a
//! configuration error instead of a crash.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{
    Channel, ConfigurationError, DeliveryAdapter, DeliveryError, DeliveryReceipt, Submission,
};
use crate::validation::{truncate_chars, FieldLimits};

/// Default EmailJS REST endpoint.
pub const DEFAULT_EMAILJS_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Per-field caps EmailJS templates accept.
pub const EMAILJS_LIMITS: FieldLimits = FieldLimits {
    name_max: 100,
    email_max: 254,
    message_max: 10_000,
};

// ---------------------------------------------------------------------------
// Relay resolution
// ---------------------------------------------------------------------------

/// Why the relay client could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No relay implementation is available to this host.
    #[error("EmailJS relay is not available. Enable an EmailJS relay or configure another channel.")]
    PackageAbsent,
    /// Transport failure while fetching the relay from elsewhere.
    #[error("Network error while loading EmailJS. Please check your connection and try again.")]
    Network(String),
    /// Anything else.
    #[error("Failed to load EmailJS: {0}")]
    Unknown(String),
}

/// Template variables sent with every message.
#[doc(hidden)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateParams {
    /// Sender name.
    pub from_name: String,
    /// Sender address.
    pub from_email: String,
    /// Message body.
    pub message: String,
    /// Recipient display name.
    pub to_name: String,
}

/// Raw relay reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayResponse {
    /// HTTP-style status code.
    pub status: u16,
    /// Response text.
    pub text: String,
}

/// Client able to hand a templated message to EmailJS.
#[async_trait]
pub trait EmailRelay: Send + Sync {
    /// Send one templated message.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::Network`] when the relay cannot be reached.
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
        public_key: &str,
    ) -> Result<RelayResponse, DeliveryError>;
}

/// Produces an [`EmailRelay`] when the channel is first used.
#[async_trait]
pub trait RelayResolver: Send + Sync {
    /// Obtain a relay client.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] describing why no relay is available.
    async fn resolve(&self) -> Result<Arc<dyn EmailRelay>, ResolveError>;
}

/// Resolver for hosts that ship no relay at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRelay;

#[async_trait]
impl RelayResolver for NoRelay {
    async fn resolve(&self) -> Result<Arc<dyn EmailRelay>, ResolveError> {
        Err(ResolveError::PackageAbsent)
    }
}

// ---------------------------------------------------------------------------
// HTTP relay
// ---------------------------------------------------------------------------

/// EmailJS REST request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct EmailJsRequest<'a> {
    /// Service id.
    pub service_id: &'a str,
    /// Template id.
    pub template_id: &'a str,
    /// Public key (called `user_id` on the wire).
    pub user_id: &'a str,
    /// Template variables.
    pub template_params: &'a TemplateParams,
}

/// Relay talking to the EmailJS REST API.
#[derive(Debug, Clone)]
pub struct HttpRelay {
    /// Send endpoint.
    #[doc(hidden)]
    pub endpoint: String,
    client: reqwest::Client,
}

#[async_trait]
impl EmailRelay for HttpRelay {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
        public_key: &str,
    ) -> Result<RelayResponse, DeliveryError> {
        let body = EmailJsRequest {
            service_id,
            template_id,
            user_id: public_key,
            template_params: params,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(RelayResponse { status, text })
    }
}

/// Resolver building an [`HttpRelay`].
#[derive(Debug, Clone)]
pub struct HttpRelayResolver {
    endpoint: String,
}

impl Default for HttpRelayResolver {
    fn default() -> Self {
        Self::new(DEFAULT_EMAILJS_URL)
    }
}

impl HttpRelayResolver {
    /// Resolver targeting `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RelayResolver for HttpRelayResolver {
    async fn resolve(&self) -> Result<Arc<dyn EmailRelay>, ResolveError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ResolveError::Unknown(e.to_string()))?;
        Ok(Arc::new(HttpRelay {
            endpoint: self.endpoint.clone(),
            client,
        }))
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// EmailJS identifiers plus the recipient display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailJsSettings {
    /// Service id.
    pub service_id: String,
    /// Template id.
    pub template_id: String,
    /// Public key.
    pub public_key: String,
    /// Name the template addresses the message to.
    pub recipient_name: String,
}

/// Delivers through EmailJS.
pub struct EmailJsAdapter {
    settings: EmailJsSettings,
    resolver: Arc<dyn RelayResolver>,
}

impl std::fmt::Debug for EmailJsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailJsAdapter")
            .field("service_id", &self.settings.service_id)
            .field("template_id", &self.settings.template_id)
            .field("public_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl EmailJsAdapter {
    /// Create an adapter that resolves its relay through `resolver`.
    pub fn new(settings: EmailJsSettings, resolver: Arc<dyn RelayResolver>) -> Self {
        Self { settings, resolver }
    }

    fn is_complete(&self) -> bool {
        let s = &self.settings;
        !s.service_id.trim().is_empty()
            && !s.template_id.trim().is_empty()
            && !s.public_key.trim().is_empty()
    }
}

/// Build template variables, truncating each field to its cap.
#[doc(hidden)]
pub fn build_params(submission: &Submission, recipient_name: &str) -> TemplateParams {
    TemplateParams {
        from_name: truncate_chars(&submission.name, EMAILJS_LIMITS.name_max),
        from_email: truncate_chars(&submission.email, EMAILJS_LIMITS.email_max),
        message: truncate_chars(&submission.message, EMAILJS_LIMITS.message_max),
        to_name: truncate_chars(recipient_name, EMAILJS_LIMITS.name_max),
    }
}

/// Accept the relay reply or turn it into a rejection.
#[doc(hidden)]
pub fn check_relay_response(response: RelayResponse) -> Result<DeliveryReceipt, DeliveryError> {
    if response.status == 200 || response.text == "OK" {
        return Ok(DeliveryReceipt {
            channel: Channel::EmailJs,
            message: None,
        });
    }
    let text = if response.text.trim().is_empty() {
        "Unknown error".to_owned()
    } else {
        response.text
    };
    Err(DeliveryError::Rejected {
        status: Some(response.status),
        message: format!("EmailJS returned error: {text}"),
    })
}

#[async_trait]
impl DeliveryAdapter for EmailJsAdapter {
    fn channel(&self) -> Channel {
        Channel::EmailJs
    }

    fn field_limits(&self) -> Option<FieldLimits> {
        Some(EMAILJS_LIMITS)
    }

    async fn deliver(&self, submission: &Submission) -> Result<DeliveryReceipt, DeliveryError> {
        let relay = self
            .resolver
            .resolve()
            .await
            .map_err(ConfigurationError::DependencyMissing)?;

        if !self.is_complete() {
            return Err(ConfigurationError::Incomplete {
                channel: Channel::EmailJs,
            }
            .into());
        }

        let params = build_params(submission, &self.settings.recipient_name);
        debug!(service_id = %self.settings.service_id, "sending via EmailJS");
        let response = relay
            .send(
                &self.settings.service_id,
                &self.settings.template_id,
                &params,
                &self.settings.public_key,
            )
            .await?;
        check_relay_response(response)
    }
}
