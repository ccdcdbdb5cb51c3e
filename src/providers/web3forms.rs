//! Web3Forms channel using the `/submit` API.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{
    is_json_response, protocol_error, Channel, ConfigurationError, DeliveryAdapter,
    DeliveryError, DeliveryReceipt, Submission,
};

/// Default Web3Forms submission endpoint.
pub const DEFAULT_WEB3FORMS_URL: &str = "https://api.web3forms.com/submit";

/// Web3Forms request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct Web3FormsRequest {
    /// Access key (trimmed).
    pub access_key: String,
    /// Email subject line.
    pub subject: String,
    /// Sender name.
    pub name: String,
    /// Sender address.
    pub email: String,
    /// Message body.
    pub message: String,
    /// Display name of the sender.
    pub from_name: String,
}

/// Delivers through Web3Forms.
#[derive(Clone)]
pub struct Web3FormsAdapter {
    access_key: String,
    /// Submission endpoint.
    #[doc(hidden)]
    pub endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for Web3FormsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3FormsAdapter")
            .field("access_key", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl Web3FormsAdapter {
    /// Create an adapter for `access_key` posting to the public endpoint.
    pub fn new(access_key: String) -> Self {
        Self {
            access_key,
            endpoint: DEFAULT_WEB3FORMS_URL.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the adapter at another endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Build the request body for `submission`.
///
/// # Errors
///
/// Returns [`ConfigurationError::MissingAccessKey`] for a blank key.
#[doc(hidden)]
pub fn build_request(
    access_key: &str,
    submission: &Submission,
) -> Result<Web3FormsRequest, ConfigurationError> {
    let access_key = access_key.trim();
    if access_key.is_empty() {
        return Err(ConfigurationError::MissingAccessKey);
    }
    Ok(Web3FormsRequest {
        access_key: access_key.to_owned(),
        subject: format!("New Contact Form Message from {}", submission.name),
        name: submission.name.clone(),
        email: submission.email.clone(),
        message: submission.message.clone(),
        from_name: submission.name.clone(),
    })
}

/// Interpret a successful-status JSON body.
///
/// # Errors
///
/// Returns [`DeliveryError::Protocol`] for unparsable JSON and
/// [`DeliveryError::Rejected`] unless the body has `"success": true`.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<DeliveryReceipt, DeliveryError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|_| protocol_error("Invalid response from form service", body))?;

    if value.get("success").and_then(Value::as_bool) == Some(true) {
        return Ok(DeliveryReceipt {
            channel: Channel::Web3Forms,
            message: None,
        });
    }

    let message = value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or("Failed to send message")
        .to_owned();
    Err(DeliveryError::Rejected {
        status: None,
        message,
    })
}

#[async_trait]
impl DeliveryAdapter for Web3FormsAdapter {
    fn channel(&self) -> Channel {
        Channel::Web3Forms
    }

    async fn deliver(&self, submission: &Submission) -> Result<DeliveryReceipt, DeliveryError> {
        let body = build_request(&self.access_key, submission)?;

        debug!(endpoint = %self.endpoint, "sending via Web3Forms");
        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: Some(status.as_u16()),
                message: format!("HTTP error! status: {}", status.as_u16()),
            });
        }

        let json = is_json_response(&response);
        let text = response.text().await?;
        if !json {
            return Err(protocol_error("Unexpected response format", &text));
        }
        parse_response(&text)
    }
}
