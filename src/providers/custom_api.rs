//! Custom endpoint channel: a plain JSON POST to an operator-supplied URL.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::{
    Channel, ConfigurationError, DeliveryAdapter, DeliveryError, DeliveryReceipt, Submission,
};

/// Delivers to an operator-supplied endpoint.
#[derive(Debug, Clone)]
pub struct CustomApiAdapter {
    endpoint: String,
    client: reqwest::Client,
}

impl CustomApiAdapter {
    /// Create an adapter for `endpoint`. The URL is checked on each
    /// delivery so a bad value fails the attempt instead of startup.
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }
}

/// Parse and vet the configured endpoint.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] when the value is blank, not an
/// absolute URL, or not http/https.
pub fn parse_endpoint(raw: &str) -> Result<Url, ConfigurationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigurationError::MissingEndpoint);
    }
    let url = Url::parse(raw).map_err(|e| ConfigurationError::InvalidEndpoint {
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigurationError::UnsupportedScheme {
            scheme: other.to_owned(),
        }),
    }
}

/// Map a non-success status and its body to a delivery error.
#[doc(hidden)]
pub fn error_for_status(status: u16, body: &str) -> DeliveryError {
    if status == 404 {
        return ConfigurationError::EndpointNotFound.into();
    }
    let message = json_message(body).unwrap_or_else(|| format!("Server error: {status}"));
    DeliveryError::Rejected {
        status: Some(status),
        message,
    }
}

/// Extract a non-empty `message` string from a JSON body.
#[doc(hidden)]
pub fn json_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_owned)
}

#[async_trait]
impl DeliveryAdapter for CustomApiAdapter {
    fn channel(&self) -> Channel {
        Channel::CustomApi
    }

    async fn deliver(&self, submission: &Submission) -> Result<DeliveryReceipt, DeliveryError> {
        let url = parse_endpoint(&self.endpoint)?;

        debug!(endpoint = %url, "sending via custom API");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), &body));
        }

        Ok(DeliveryReceipt {
            channel: Channel::CustomApi,
            message: json_message(&body),
        })
    }
}
