//! Delivery channel abstraction.
//!
//! Defines the [`DeliveryAdapter`] trait and the shared submission,
//! receipt and error types used by every channel.
//!
//! Three channels are implemented:
//! - [`emailjs::EmailJsAdapter`]: hosted email relay
//! - [`web3forms::Web3FormsAdapter`]: hosted form relay
//! - [`custom_api::CustomApiAdapter`]: any JSON endpoint
//!
//! The [`router::ProviderRouter`] picks exactly one of them by
//! configuration completeness (EmailJS → Web3Forms → custom API).

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ChannelsConfig;
use crate::validation::{sanitize_str, FieldLimits, FormState};

pub mod custom_api;
pub mod emailjs;
pub mod router;
pub mod web3forms;

/// Maximum characters of an unexpected response body kept for diagnostics.
pub const BODY_PREVIEW_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// A delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Hosted email relay.
    EmailJs,
    /// Hosted form relay.
    Web3Forms,
    /// Operator-supplied JSON endpoint.
    CustomApi,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EmailJs => "EmailJS",
            Self::Web3Forms => "Web3Forms",
            Self::CustomApi => "custom API",
        })
    }
}

/// Channel settings for the active provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfig {
    /// Hosted email relay identifiers.
    EmailJs {
        /// Relay service id.
        service_id: String,
        /// Relay template id.
        template_id: String,
        /// Relay public key.
        public_key: String,
    },
    /// Hosted form relay key.
    Web3Forms {
        /// Form relay access key.
        access_key: String,
    },
    /// Operator endpoint.
    CustomApi {
        /// Absolute http(s) URL receiving the POST.
        endpoint_url: String,
    },
}

impl ProviderConfig {
    /// Pick the first channel whose required settings are all non-empty,
    /// in priority order EmailJS, Web3Forms, custom API.
    ///
    /// A whitespace-only value still counts as set; the chosen adapter
    /// rejects it when the message is sent.
    pub fn select(channels: &ChannelsConfig) -> Option<Self> {
        let filled = |value: &str| !value.is_empty();

        let emailjs = &channels.emailjs;
        if filled(&emailjs.service_id) && filled(&emailjs.template_id) && filled(&emailjs.public_key)
        {
            return Some(Self::EmailJs {
                service_id: emailjs.service_id.clone(),
                template_id: emailjs.template_id.clone(),
                public_key: emailjs.public_key.clone(),
            });
        }
        if filled(&channels.web3forms.access_key) {
            return Some(Self::Web3Forms {
                access_key: channels.web3forms.access_key.clone(),
            });
        }
        if filled(&channels.custom_api.endpoint_url) {
            return Some(Self::CustomApi {
                endpoint_url: channels.custom_api.endpoint_url.clone(),
            });
        }
        None
    }

    /// Channel this configuration drives.
    pub fn channel(&self) -> Channel {
        match self {
            Self::EmailJs { .. } => Channel::EmailJs,
            Self::Web3Forms { .. } => Channel::Web3Forms,
            Self::CustomApi { .. } => Channel::CustomApi,
        }
    }
}

/// Outbound message with every field sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Sender display name.
    pub name: String,
    /// Sender reply address.
    pub email: String,
    /// Message body.
    pub message: String,
}

impl Submission {
    /// Build a submission from stored form values, escaping them once more.
    pub fn from_form(form: &FormState) -> Self {
        Self {
            name: sanitize_str(&form.name),
            email: sanitize_str(&form.email),
            message: sanitize_str(&form.message),
        }
    }
}

/// Acknowledgement from the channel that received the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Channel that accepted the message.
    pub channel: Channel,
    /// Optional confirmation text supplied by the channel.
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Setup problems. Fatal to the attempt; the message points at the fix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// No channel has complete settings.
    #[error("Contact form is not configured. Please set up EmailJS, Web3Forms, or a custom API endpoint.")]
    NotConfigured,
    /// A channel was selected but some of its settings are blank.
    #[error("{channel} configuration is incomplete")]
    Incomplete {
        /// Channel with missing settings.
        channel: Channel,
    },
    /// The EmailJS relay could not be obtained.
    #[error(transparent)]
    DependencyMissing(#[from] emailjs::ResolveError),
    /// Web3Forms access key is blank.
    #[error("Web3Forms access key is required")]
    MissingAccessKey,
    /// Custom endpoint is blank.
    #[error("API endpoint is required")]
    MissingEndpoint,
    /// Custom endpoint is not an absolute URL.
    #[error("Invalid API endpoint URL format: {reason}")]
    InvalidEndpoint {
        /// Parser explanation.
        reason: String,
    },
    /// Custom endpoint uses something other than http or https.
    #[error("API endpoint must use HTTP or HTTPS protocol (got '{scheme}')")]
    UnsupportedScheme {
        /// Rejected scheme.
        scheme: String,
    },
    /// Custom endpoint answered 404.
    #[error("API endpoint not found. Please check your CONTACT_API_URL configuration.")]
    EndpointNotFound,
}

/// Failure of a delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Setup problem detected before or during the attempt.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Transport failure reaching the channel.
    #[error("network error: {0}")]
    Network(String),
    /// Response had an unexpected shape or content type.
    #[error("{reason}: {preview}")]
    Protocol {
        /// What was wrong with the response.
        reason: String,
        /// Leading characters of the raw body.
        preview: String,
    },
    /// Channel explicitly reported non-success.
    #[error("{message}")]
    Rejected {
        /// HTTP status, when the channel replied over HTTP.
        status: Option<u16>,
        /// Channel-supplied or synthesized explanation.
        message: String,
    },
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl DeliveryError {
    /// Text suitable for the failure notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Network error. Please check your connection and try again.".to_owned()
            }
            other => other.to_string(),
        }
    }

    /// Returns true for setup problems.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Build a protocol error carrying a short preview of `body`.
pub fn protocol_error(reason: &str, body: &str) -> DeliveryError {
    DeliveryError::Protocol {
        reason: reason.to_owned(),
        preview: body.chars().take(BODY_PREVIEW_CHARS).collect(),
    }
}

/// Returns true when the response declares a JSON body.
pub fn is_json_response(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"))
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single delivery channel.
///
/// Implementations must be `Send + Sync` so a router can be shared across
/// tasks.
#[async_trait]
pub trait DeliveryAdapter: Send + Sync {
    /// Channel this adapter delivers through.
    fn channel(&self) -> Channel;

    /// Extra length caps this channel imposes, if any.
    fn field_limits(&self) -> Option<FieldLimits> {
        None
    }

    /// Deliver one message. Called at most once per submission.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] on configuration, transport, protocol, or
    /// remote rejection failures.
    async fn deliver(&self, submission: &Submission) -> Result<DeliveryReceipt, DeliveryError>;
}
