//! Channel selection and single-attempt routing.

use std::sync::Arc;

use contact_relay::config::{ChannelsConfig, ContactConfig};
use contact_relay::providers::emailjs::{HttpRelayResolver, NoRelay};
use contact_relay::providers::router::ProviderRouter;
use contact_relay::providers::{
    Channel, ConfigurationError, DeliveryError, ProviderConfig, Submission,
};

use crate::support::{serve_once, tripwire};

fn submission() -> Submission {
    Submission {
        name: "Linus".to_owned(),
        email: "linus@example.com".to_owned(),
        message: "Patch attached, please review".to_owned(),
    }
}

fn emailjs(channels: &mut ChannelsConfig) {
    channels.emailjs.service_id = "service_abc".to_owned();
    channels.emailjs.template_id = "template_xyz".to_owned();
    channels.emailjs.public_key = "pk_123".to_owned();
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

#[test]
fn nothing_configured_selects_nothing() {
    assert_eq!(ProviderConfig::select(&ChannelsConfig::default()), None);
}

#[test]
fn emailjs_wins_when_everything_is_set() {
    let mut channels = ChannelsConfig::default();
    emailjs(&mut channels);
    channels.web3forms.access_key = "w3f-key".to_owned();
    channels.custom_api.endpoint_url = "https://example.com/contact".to_owned();

    let selected = ProviderConfig::select(&channels).map(|p| p.channel());
    assert_eq!(selected, Some(Channel::EmailJs));
}

#[test]
fn partial_emailjs_falls_to_web3forms() {
    let mut channels = ChannelsConfig::default();
    emailjs(&mut channels);
    channels.emailjs.public_key = String::new();
    channels.web3forms.access_key = "w3f-key".to_owned();

    assert_eq!(
        ProviderConfig::select(&channels),
        Some(ProviderConfig::Web3Forms {
            access_key: "w3f-key".to_owned()
        })
    );
}

#[test]
fn whitespace_value_still_selects_its_channel() {
    let mut channels = ChannelsConfig::default();
    channels.web3forms.access_key = "   ".to_owned();
    channels.custom_api.endpoint_url = "https://example.com/contact".to_owned();

    let selected = ProviderConfig::select(&channels).map(|p| p.channel());
    assert_eq!(selected, Some(Channel::Web3Forms));
}

#[test]
fn custom_api_is_last_resort() {
    let mut channels = ChannelsConfig::default();
    channels.custom_api.endpoint_url = "https://example.com/contact".to_owned();

    let selected = ProviderConfig::select(&channels).map(|p| p.channel());
    assert_eq!(selected, Some(Channel::CustomApi));
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unconfigured_router_fails_without_network() {
    let router = ProviderRouter::from_config(&ContactConfig::default());
    assert_eq!(router.active_channel(), None);
    assert_eq!(router.field_limits(), None);

    match router.submit(&submission()).await {
        Err(err @ DeliveryError::Configuration(ConfigurationError::NotConfigured)) => {
            assert!(err.user_message().starts_with("Contact form is not configured."));
        }
        other => panic!("expected NotConfigured, got {other:?}"),
    }
}

#[tokio::test]
async fn emailjs_failure_does_not_fall_through() {
    let wire = tripwire().await;
    let mut config = ContactConfig::default();
    emailjs(&mut config.channels);
    config.channels.custom_api.endpoint_url = wire.url.clone();

    let router = ProviderRouter::from_config_with_resolver(&config, Arc::new(NoRelay));
    assert_eq!(router.active_channel(), Some(Channel::EmailJs));

    let err = router
        .submit(&submission())
        .await
        .expect_err("missing relay should fail");
    assert!(err.is_configuration());
    wire.assert_untouched().await;
}

#[tokio::test]
async fn whitespace_web3forms_key_fails_instead_of_falling_through() {
    let wire = tripwire().await;
    let mut config = ContactConfig::default();
    config.channels.web3forms.access_key = "   ".to_owned();
    config.channels.custom_api.endpoint_url = wire.url.clone();

    let router = ProviderRouter::from_config(&config);
    assert_eq!(router.active_channel(), Some(Channel::Web3Forms));

    assert!(matches!(
        router.submit(&submission()).await,
        Err(DeliveryError::Configuration(
            ConfigurationError::MissingAccessKey
        ))
    ));
    wire.assert_untouched().await;
}

#[tokio::test]
async fn padded_emailjs_key_is_incomplete_not_skipped() {
    let wire = tripwire().await;
    let mut config = ContactConfig::default();
    emailjs(&mut config.channels);
    config.channels.emailjs.public_key = "  ".to_owned();
    config.channels.web3forms.access_key = "w3f-key".to_owned();

    let router = ProviderRouter::from_config_with_resolver(
        &config,
        Arc::new(HttpRelayResolver::new(wire.url.clone())),
    );
    assert_eq!(router.active_channel(), Some(Channel::EmailJs));

    match router.submit(&submission()).await {
        Err(DeliveryError::Configuration(ConfigurationError::Incomplete { channel })) => {
            assert_eq!(channel, Channel::EmailJs);
        }
        other => panic!("expected incomplete configuration, got {other:?}"),
    }
    wire.assert_untouched().await;
}

#[test]
fn only_emailjs_imposes_field_caps() {
    let mut config = ContactConfig::default();
    emailjs(&mut config.channels);
    let router = ProviderRouter::from_config_with_resolver(&config, Arc::new(NoRelay));
    assert!(router.field_limits().is_some());

    let mut config = ContactConfig::default();
    config.channels.web3forms.access_key = "w3f-key".to_owned();
    let router = ProviderRouter::from_config(&config);
    assert_eq!(router.active_channel(), Some(Channel::Web3Forms));
    assert_eq!(router.field_limits(), None);
}

#[tokio::test]
async fn custom_api_router_delivers_once() {
    let stub = serve_once("200 OK", "application/json", r#"{"message":"Got it"}"#).await;
    let mut config = ContactConfig::default();
    config.channels.custom_api.endpoint_url = stub.url.clone();

    let router = ProviderRouter::from_config(&config);
    assert_eq!(router.active_channel(), Some(Channel::CustomApi));

    let receipt = router
        .submit(&submission())
        .await
        .expect("delivery should succeed");
    assert_eq!(receipt.channel, Channel::CustomApi);
    assert_eq!(receipt.message.as_deref(), Some("Got it"));

    let body = stub.request_json().await;
    assert_eq!(body["name"], "Linus");
}

#[test]
fn debug_names_active_channel() {
    let router = ProviderRouter::unconfigured();
    assert_eq!(format!("{router:?}"), "ProviderRouter { channel: None }");
}
