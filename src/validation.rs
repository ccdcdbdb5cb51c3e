//! Field validation and input sanitization for the contact form.
//!
//! Validation runs over the stored (already sanitized) [`FormState`] and
//! reports every failing field at once. Sanitization is a minimal HTML
//! entity escape applied whenever text enters the form and again before
//! any provider sees it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum trimmed name length (inclusive).
pub const NAME_MIN: usize = 2;
/// Maximum trimmed name length (inclusive).
pub const NAME_MAX: usize = 100;
/// Minimum trimmed message length (inclusive).
pub const MESSAGE_MIN: usize = 10;
/// Maximum trimmed message length (inclusive).
pub const MESSAGE_MAX: usize = 5000;

static EMAIL_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    )
    .ok()
});

// ---------------------------------------------------------------------------
// Form model
// ---------------------------------------------------------------------------

/// One of the three contact form inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    /// Sender display name.
    Name,
    /// Sender reply address.
    Email,
    /// Message body.
    Message,
}

impl Field {
    /// All fields in display order.
    pub const ALL: [Field; 3] = [Field::Name, Field::Email, Field::Message];

    /// Lowercase wire name of the field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Message => "message",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Email => "Email",
            Self::Message => "Message",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-progress contact form content. Every field is always present;
/// the empty string is the reset value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormState {
    /// Sender display name.
    #[serde(default)]
    pub name: String,
    /// Sender reply address.
    #[serde(default)]
    pub email: String,
    /// Message body.
    #[serde(default)]
    pub message: String,
}

impl FormState {
    /// Build a form from borrowed values.
    pub fn new(name: &str, email: &str, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            email: email.to_owned(),
            message: message.to_owned(),
        }
    }

    /// Value currently stored for `field`.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::Message => &self.message,
        }
    }

    /// Overwrite the value stored for `field`.
    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Name => self.name = value,
            Field::Email => self.email = value,
            Field::Message => self.message = value,
        }
    }

    /// Returns true when every field is the empty string.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.email.is_empty() && self.message.is_empty()
    }
}

/// Per-field error messages. A missing key means the field is valid.
pub type ValidationErrors = BTreeMap<Field, String>;

/// Channel-specific maximum lengths, checked on top of the base bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    /// Maximum name length.
    pub name_max: usize,
    /// Maximum email length.
    pub email_max: usize,
    /// Maximum message length.
    pub message_max: usize,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a single field value against its base rule.
pub fn validate_field(field: Field, value: &str) -> bool {
    let trimmed = value.trim();
    match field {
        Field::Name => within(trimmed, NAME_MIN, NAME_MAX),
        Field::Message => within(trimmed, MESSAGE_MIN, MESSAGE_MAX),
        Field::Email => is_valid_email(trimmed),
    }
}

fn within(value: &str, min: usize, max: usize) -> bool {
    let len = value.chars().count();
    len >= min && len <= max
}

fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}

/// Validate every field independently and collect all failures.
///
/// When `limits` is given (an active channel with its own caps), each
/// non-empty field is also checked against the channel maximum. A channel
/// violation replaces the base message for that field.
pub fn validate_all(form: &FormState, limits: Option<&FieldLimits>) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for field in Field::ALL {
        let value = form.get(field);
        if value.trim().is_empty() {
            errors.insert(field, format!("{} is required", field.label()));
        } else if !validate_field(field, value) {
            errors.insert(field, bound_message(field));
        }
    }

    if let Some(limits) = limits {
        errors.extend(check_channel_limits(form, limits));
    }

    errors
}

fn bound_message(field: Field) -> String {
    match field {
        Field::Name => format!("Name must be between {NAME_MIN} and {NAME_MAX} characters"),
        Field::Email => "Please enter a valid email address".to_owned(),
        Field::Message => {
            format!("Message must be between {MESSAGE_MIN} and {MESSAGE_MAX} characters")
        }
    }
}

fn check_channel_limits(form: &FormState, limits: &FieldLimits) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let over = |value: &str, max: usize| !value.is_empty() && value.chars().count() > max;

    if over(&form.name, limits.name_max) {
        errors.insert(
            Field::Name,
            format!(
                "Name must be {} characters or less for email service",
                limits.name_max
            ),
        );
    }
    if over(&form.email, limits.email_max) {
        errors.insert(
            Field::Email,
            format!("Email must be {} characters or less", limits.email_max),
        );
    }
    if over(&form.message, limits.message_max) {
        errors.insert(
            Field::Message,
            format!(
                "Message must be {} characters or less for email service",
                limits.message_max
            ),
        );
    }
    errors
}

// ---------------------------------------------------------------------------
// Sanitization
// ---------------------------------------------------------------------------

/// Escape the five HTML metacharacters. `None` yields an empty string.
///
/// Not idempotent: an existing `&amp;` becomes `&amp;amp;`.
pub fn sanitize(raw: Option<&str>) -> String {
    raw.map(sanitize_str).unwrap_or_default()
}

/// Escape the five HTML metacharacters in `raw`.
pub fn sanitize_str(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
