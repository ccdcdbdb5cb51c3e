//! EmailJS channel: relay resolution, truncation and the HTTP relay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use contact_relay::providers::emailjs::{
    build_params, EmailJsAdapter, EmailJsSettings, EmailRelay, HttpRelayResolver, NoRelay,
    RelayResolver, RelayResponse, ResolveError, TemplateParams, EMAILJS_LIMITS,
};
use contact_relay::providers::{
    Channel, ConfigurationError, DeliveryAdapter, DeliveryError, Submission,
};

use crate::support::serve_once;

fn settings() -> EmailJsSettings {
    EmailJsSettings {
        service_id: "service_abc".to_owned(),
        template_id: "template_xyz".to_owned(),
        public_key: "pk_123".to_owned(),
        recipient_name: "Site Owner".to_owned(),
    }
}

fn submission() -> Submission {
    Submission {
        name: "Ada".to_owned(),
        email: "ada@example.com".to_owned(),
        message: "Hello there, this is a test".to_owned(),
    }
}

/// Relay that records what it was asked to send and answers with a fixed reply.
struct RecordingRelay {
    reply: RelayResponse,
    sent: Mutex<Vec<(String, String, TemplateParams, String)>>,
}

#[async_trait]
impl EmailRelay for RecordingRelay {
    async fn send(
        &self,
        service_id: &str,
        template_id: &str,
        params: &TemplateParams,
        public_key: &str,
    ) -> Result<RelayResponse, DeliveryError> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((
                service_id.to_owned(),
                template_id.to_owned(),
                params.clone(),
                public_key.to_owned(),
            ));
        Ok(self.reply.clone())
    }
}

struct FixedResolver {
    relay: Arc<RecordingRelay>,
    calls: AtomicUsize,
}

impl FixedResolver {
    fn new(status: u16, text: &str) -> Arc<Self> {
        Arc::new(Self {
            relay: Arc::new(RecordingRelay {
                reply: RelayResponse {
                    status,
                    text: text.to_owned(),
                },
                sent: Mutex::new(Vec::new()),
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn sent(&self) -> Vec<(String, String, TemplateParams, String)> {
        self.relay
            .sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl RelayResolver for FixedResolver {
    async fn resolve(&self) -> Result<Arc<dyn EmailRelay>, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let relay: Arc<dyn EmailRelay> = self.relay.clone();
        Ok(relay)
    }
}

struct FailingResolver(ResolveError);

#[async_trait]
impl RelayResolver for FailingResolver {
    async fn resolve(&self) -> Result<Arc<dyn EmailRelay>, ResolveError> {
        Err(self.0.clone())
    }
}

#[tokio::test]
async fn missing_relay_is_configuration_error() {
    let adapter = EmailJsAdapter::new(settings(), Arc::new(NoRelay));
    let err = adapter
        .deliver(&submission())
        .await
        .expect_err("no relay should fail");
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        DeliveryError::Configuration(ConfigurationError::DependencyMissing(
            ResolveError::PackageAbsent
        ))
    ));
}

#[tokio::test]
async fn resolver_network_failure_has_network_wording() {
    let resolver = FailingResolver(ResolveError::Network("dns failure".to_owned()));
    let adapter = EmailJsAdapter::new(settings(), Arc::new(resolver));
    let err = adapter
        .deliver(&submission())
        .await
        .expect_err("resolver failure should surface");
    assert!(err.user_message().contains("Network error while loading EmailJS"));
}

#[tokio::test]
async fn resolver_unknown_failure_keeps_detail() {
    let resolver = FailingResolver(ResolveError::Unknown("bad build".to_owned()));
    let adapter = EmailJsAdapter::new(settings(), Arc::new(resolver));
    let err = adapter
        .deliver(&submission())
        .await
        .expect_err("resolver failure should surface");
    assert_eq!(err.user_message(), "Failed to load EmailJS: bad build");
}

#[tokio::test]
async fn blank_identifier_is_incomplete_and_sends_nothing() {
    let resolver = FixedResolver::new(200, "OK");
    let mut partial = settings();
    partial.template_id = "  ".to_owned();
    let adapter = EmailJsAdapter::new(partial, resolver.clone());

    match adapter.deliver(&submission()).await {
        Err(DeliveryError::Configuration(ConfigurationError::Incomplete { channel })) => {
            assert_eq!(channel, Channel::EmailJs);
        }
        other => panic!("expected incomplete configuration, got {other:?}"),
    }
    assert!(resolver.sent().is_empty());
}

#[tokio::test]
async fn relay_receives_identifiers_and_template_params() {
    let resolver = FixedResolver::new(200, "OK");
    let adapter = EmailJsAdapter::new(settings(), resolver.clone());

    let receipt = adapter
        .deliver(&submission())
        .await
        .expect("delivery should succeed");
    assert_eq!(receipt.channel, Channel::EmailJs);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);

    let sent = resolver.sent();
    assert_eq!(sent.len(), 1);
    let (service_id, template_id, params, public_key) = &sent[0];
    assert_eq!(service_id, "service_abc");
    assert_eq!(template_id, "template_xyz");
    assert_eq!(public_key, "pk_123");
    assert_eq!(
        params,
        &TemplateParams {
            from_name: "Ada".to_owned(),
            from_email: "ada@example.com".to_owned(),
            message: "Hello there, this is a test".to_owned(),
            to_name: "Site Owner".to_owned(),
        }
    );
}

#[tokio::test]
async fn relay_error_text_is_reported() {
    let resolver = FixedResolver::new(400, "The template ID is invalid");
    let adapter = EmailJsAdapter::new(settings(), resolver);
    match adapter.deliver(&submission()).await {
        Err(err @ DeliveryError::Rejected { .. }) => assert_eq!(
            err.user_message(),
            "EmailJS returned error: The template ID is invalid"
        ),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[test]
fn params_are_truncated_to_channel_caps() {
    let long = Submission {
        name: "n".repeat(150),
        email: format!("{}@example.com", "e".repeat(300)),
        message: "m".repeat(12_000),
    };
    let params = build_params(&long, "Site Owner");
    assert_eq!(params.from_name.chars().count(), EMAILJS_LIMITS.name_max);
    assert_eq!(params.from_email.chars().count(), EMAILJS_LIMITS.email_max);
    assert_eq!(params.message.chars().count(), EMAILJS_LIMITS.message_max);
    assert_eq!(params.to_name, "Site Owner");
}

#[test]
fn adapter_reports_channel_caps() {
    let adapter = EmailJsAdapter::new(settings(), Arc::new(NoRelay));
    assert_eq!(adapter.field_limits(), Some(EMAILJS_LIMITS));
    assert_eq!(adapter.channel(), Channel::EmailJs);
}

#[test]
fn debug_output_redacts_public_key() {
    let adapter = EmailJsAdapter::new(settings(), Arc::new(NoRelay));
    let debug = format!("{adapter:?}");
    assert!(!debug.contains("pk_123"));
    assert!(debug.contains("[REDACTED]"));
}

#[tokio::test]
async fn http_relay_posts_rest_request() {
    let stub = serve_once("200 OK", "text/plain", "OK").await;
    let resolver = Arc::new(HttpRelayResolver::new(stub.url.clone()));
    let adapter = EmailJsAdapter::new(settings(), resolver);

    adapter
        .deliver(&submission())
        .await
        .expect("delivery should succeed");

    let body = stub.request_json().await;
    assert_eq!(body["service_id"], "service_abc");
    assert_eq!(body["template_id"], "template_xyz");
    assert_eq!(body["user_id"], "pk_123");
    assert_eq!(body["template_params"]["from_name"], "Ada");
    assert_eq!(body["template_params"]["from_email"], "ada@example.com");
    assert_eq!(body["template_params"]["to_name"], "Site Owner");
}

#[tokio::test]
async fn http_relay_rejection_carries_status() {
    let stub = serve_once("403 Forbidden", "text/plain", "Public key is invalid").await;
    let resolver = Arc::new(HttpRelayResolver::new(stub.url.clone()));
    let adapter = EmailJsAdapter::new(settings(), resolver);

    match adapter.deliver(&submission()).await {
        Err(DeliveryError::Rejected { status, message }) => {
            assert_eq!(status, Some(403));
            assert_eq!(message, "EmailJS returned error: Public key is invalid");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
