//! Configuration loading.
//!
//! Settings come from `./contact.toml` (or `$CONTACT_CONFIG_PATH`),
//! overridden by environment variables. A `.env` file in the working
//! directory supplies variables that are not set in the process
//! environment.
//!
//! Precedence: process env > `.env` > config file > defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::limiter::DEFAULT_MIN_INTERVAL;

/// Placeholder values shipped in sample configuration files.
const PLACEHOLDERS: [&str; 3] = [
    "your_service_id_here",
    "your_template_id_here",
    "your_public_key_here",
];

/// Top-level configuration, read once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContactConfig {
    /// Name the message is addressed to.
    pub recipient_name: String,
    /// Delivery channel settings.
    #[serde(flatten)]
    pub channels: ChannelsConfig,
    /// Draft storage settings.
    pub draft: DraftConfig,
    /// Submission interval settings.
    pub rate_limit: RateLimitConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recipient_name: default_recipient_name(),
            channels: ChannelsConfig::default(),
            draft: DraftConfig::default(),
            rate_limit: RateLimitConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings for all three channels. Blank values mean "not configured".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// EmailJS identifiers.
    pub emailjs: EmailJsConfig,
    /// Web3Forms key.
    pub web3forms: Web3FormsConfig,
    /// Custom endpoint.
    pub custom_api: CustomApiConfig,
}

/// EmailJS identifiers (`[emailjs]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmailJsConfig {
    /// Service id.
    pub service_id: String,
    /// Template id.
    pub template_id: String,
    /// Public key.
    pub public_key: String,
}

/// Web3Forms settings (`[web3forms]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Web3FormsConfig {
    /// Access key.
    pub access_key: String,
}

/// Custom endpoint settings (`[custom_api]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomApiConfig {
    /// Absolute http(s) URL.
    pub endpoint_url: String,
}

/// Draft storage settings (`[draft]`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftConfig {
    /// Directory for the draft file. Defaults to `~/.contact-relay/drafts`.
    pub dir: Option<PathBuf>,
}

/// Submission interval settings (`[rate_limit]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Minimum milliseconds between accepted submissions.
    pub min_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: u64::try_from(DEFAULT_MIN_INTERVAL.as_millis()).unwrap_or(5000),
        }
    }
}

impl RateLimitConfig {
    /// Interval as a [`Duration`].
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Log output settings (`[logging]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `debug` or
    /// `contact_relay=trace`.
    pub level: String,
    /// Directory for daily JSON log files. Console only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

fn default_recipient_name() -> String {
    "Site Owner".to_owned()
}

impl ContactConfig {
    /// Load configuration with precedence env > `.env` > file > defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if `.env` is malformed.
    pub fn load() -> anyhow::Result<Self> {
        let dotenv = load_dotenv(Path::new(".env"))?;
        let env = |key: &str| std::env::var(key).ok().or_else(|| dotenv.get(key).cloned());

        let path = config_path_with(&env);
        let mut config = Self::load_from_file(&path)?;
        config.apply_overrides(env);
        Ok(config)
    }

    /// Load from a TOML file only. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                Self::from_toml(&contents)
                    .with_context(|| format!("failed to parse config at {}", path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "failed to read config at {}: {e}",
                path.display()
            )),
        }
    }

    /// Parse a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed TOML.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("failed to parse config TOML")
    }

    /// Apply environment overrides through `env`, a variable lookup.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CONTACT_EMAILJS_SERVICE_ID") {
            self.channels.emailjs.service_id = v;
        }
        if let Some(v) = env("CONTACT_EMAILJS_TEMPLATE_ID") {
            self.channels.emailjs.template_id = v;
        }
        if let Some(v) = env("CONTACT_EMAILJS_PUBLIC_KEY") {
            self.channels.emailjs.public_key = v;
        }
        if let Some(v) = env("CONTACT_WEB3FORMS_ACCESS_KEY") {
            self.channels.web3forms.access_key = v;
        }
        if let Some(v) = env("CONTACT_API_URL") {
            self.channels.custom_api.endpoint_url = v;
        }
        if let Some(v) = env("CONTACT_RECIPIENT_NAME").filter(|v| !v.trim().is_empty()) {
            self.recipient_name = v;
        }
        if let Some(v) = env("CONTACT_DRAFT_DIR").filter(|v| !v.trim().is_empty()) {
            self.draft.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("CONTACT_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.logging.level = v;
        }
        if let Some(v) = env("CONTACT_LOG_DIR").filter(|v| !v.trim().is_empty()) {
            self.logging.dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env("CONTACT_RATE_LIMIT_MS") {
            match v.parse() {
                Ok(ms) => self.rate_limit.min_interval_ms = ms,
                Err(_) => tracing::warn!(
                    var = "CONTACT_RATE_LIMIT_MS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Directory the draft is stored in.
    ///
    /// # Errors
    ///
    /// Returns an error when no directory is configured and the home
    /// directory cannot be determined.
    pub fn draft_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.draft.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(data_dir()?.join("drafts")),
        }
    }

    /// Setup problems worth telling the operator about.
    pub fn environment_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let emailjs = &self.channels.emailjs;
        let unset = |value: &str| value.trim().is_empty() || PLACEHOLDERS.contains(&value.trim());

        let missing: Vec<&str> = [
            ("CONTACT_EMAILJS_SERVICE_ID", emailjs.service_id.as_str()),
            ("CONTACT_EMAILJS_TEMPLATE_ID", emailjs.template_id.as_str()),
            ("CONTACT_EMAILJS_PUBLIC_KEY", emailjs.public_key.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| unset(value))
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            warnings.push(format!(
                "EmailJS settings are missing or have placeholder values: {}",
                missing.join(", ")
            ));
        }

        if !missing.is_empty()
            && self.channels.web3forms.access_key.trim().is_empty()
            && self.channels.custom_api.endpoint_url.trim().is_empty()
        {
            warnings.push(
                "No contact form service configured. Please set up EmailJS, Web3Forms, or a custom API endpoint."
                    .to_owned(),
            );
        }
        warnings
    }
}

/// Resolve the config file path via `CONTACT_CONFIG_PATH`, else `./contact.toml`.
pub fn config_path_with(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    env("CONTACT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("contact.toml"))
}

/// Resolve the data directory (`~/.contact-relay/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".contact-relay"))
}

/// Read a `.env` file into a map without touching the process environment.
/// A missing file yields an empty map.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_dotenv(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    for item in iter {
        let (key, value) =
            item.with_context(|| format!("failed to parse entry in {}", path.display()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}
