//! Contact form orchestration.
//!
//! [`ContactForm`] owns every piece of per-session state and wires the
//! components together:
//!
//! ```text
//! keystroke ─▶ sanitize ─▶ FormState ─▶ DraftStore::save
//! submit    ─▶ RateLimiter ─▶ validate_all ─▶ ProviderRouter ─▶ ToastQueue
//!                                                   └─ success ─▶ DraftStore::clear + reset
//! ```
//!
//! Every submit produces exactly one toast. Nothing on the submit path
//! panics or returns an error to the caller; failures become
//! [`SubmitOutcome`] variants.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ContactConfig;
use crate::draft::DraftStore;
use crate::limiter::RateLimiter;
use crate::providers::router::ProviderRouter;
use crate::providers::{Channel, ConfigurationError, DeliveryError, DeliveryReceipt, Submission};
use crate::toast::{
    ToastId, ToastKind, ToastQueue, DURATION_DEFAULT, DURATION_LONG, DURATION_SHORT,
};
use crate::validation::{sanitize_str, validate_all, Field, FormState, ValidationErrors, MESSAGE_MAX};

/// Text of the success toast when the channel supplies none.
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Message sent successfully!";

/// Text of the toast shown when validation blocks a submission.
pub const VALIDATION_MESSAGE: &str = "Please fix the highlighted fields.";

/// How a submit attempt ended. Each variant names the toast it produced.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The active channel acknowledged the message.
    Delivered {
        /// Success toast.
        toast: ToastId,
        /// Channel acknowledgement.
        receipt: DeliveryReceipt,
    },
    /// Blocked because the previous accepted submission was too recent.
    RateLimited {
        /// Error toast.
        toast: ToastId,
        /// Time left in the interval.
        remaining: Duration,
    },
    /// Blocked by field validation; nothing was sent.
    Invalid {
        /// Warning toast.
        toast: ToastId,
        /// Per-field problems.
        errors: ValidationErrors,
    },
    /// Delivery was attempted and failed.
    Failed {
        /// Error toast.
        toast: ToastId,
        /// What went wrong.
        error: DeliveryError,
    },
}

impl SubmitOutcome {
    /// Toast produced by this outcome.
    pub fn toast(&self) -> ToastId {
        match self {
            Self::Delivered { toast, .. }
            | Self::RateLimited { toast, .. }
            | Self::Invalid { toast, .. }
            | Self::Failed { toast, .. } => *toast,
        }
    }

    /// Returns true when the message was delivered.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Character counter shown under the message field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageCounter {
    /// Current message length in characters.
    pub len: usize,
    /// Base maximum.
    pub max: usize,
    /// True once the message passes 90% of the maximum.
    pub near_limit: bool,
}

/// Per-session contact form state and submission pipeline.
#[derive(Debug)]
pub struct ContactForm {
    form: Mutex<FormState>,
    errors: Mutex<ValidationErrors>,
    limiter: Mutex<RateLimiter>,
    router: ProviderRouter,
    drafts: DraftStore,
    toasts: ToastQueue,
    in_flight: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts one pending delivery until dropped, including when the submit
/// future is cancelled mid-delivery.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ContactForm {
    /// Create a form hydrated from `drafts`.
    pub fn new(router: ProviderRouter, drafts: DraftStore, limiter: RateLimiter) -> Self {
        let form = drafts.load();
        if !form.is_empty() {
            debug!("form hydrated from draft");
        }
        Self {
            form: Mutex::new(form),
            errors: Mutex::new(ValidationErrors::new()),
            limiter: Mutex::new(limiter),
            router,
            drafts,
            toasts: ToastQueue::new(),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Build a form from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the draft directory cannot be resolved.
    pub fn from_config(config: &ContactConfig) -> anyhow::Result<Self> {
        let drafts = DraftStore::in_dir(config.draft_dir()?);
        let limiter = RateLimiter::new(config.rate_limit.min_interval());
        Ok(Self::new(ProviderRouter::from_config(config), drafts, limiter))
    }

    /// Apply a keystroke: sanitize, store, clear that field's error and
    /// persist the draft when anything has been typed.
    pub fn update_field(&self, field: Field, raw: &str) {
        let snapshot = {
            let mut form = lock(&self.form);
            form.set(field, sanitize_str(raw));
            form.clone()
        };
        lock(&self.errors).remove(&field);
        if !snapshot.is_empty() {
            self.drafts.save(&snapshot);
        }
    }

    /// Run one submission attempt.
    pub async fn submit(&self) -> SubmitOutcome {
        let now = Instant::now();

        let form = {
            let mut limiter = lock(&self.limiter);
            let decision = limiter.check(now);
            if !decision.allowed {
                let secs = decision.remaining_secs();
                let plural = if secs == 1 { "" } else { "s" };
                warn!(remaining_ms = decision.remaining_ms(), "submission rate limited");
                let toast = self.toasts.push(
                    format!("Please wait {secs} second{plural} before submitting again."),
                    ToastKind::Error,
                    DURATION_SHORT,
                );
                return SubmitOutcome::RateLimited {
                    toast,
                    remaining: decision.remaining,
                };
            }

            let form = lock(&self.form).clone();
            let errors = validate_all(&form, self.router.field_limits().as_ref());
            if !errors.is_empty() {
                debug!(fields = ?errors.keys().collect::<Vec<_>>(), "submission failed validation");
                *lock(&self.errors) = errors.clone();
                let toast = self
                    .toasts
                    .push(VALIDATION_MESSAGE, ToastKind::Warning, DURATION_SHORT);
                return SubmitOutcome::Invalid { toast, errors };
            }

            lock(&self.errors).clear();
            limiter.record(now);
            form
        };

        let submission = Submission::from_form(&form);
        let result = {
            let _pending = InFlight::enter(&self.in_flight);
            self.router.submit(&submission).await
        };

        match result {
            Ok(receipt) => {
                let text = receipt
                    .message
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_owned());
                let toast = self.toasts.push(text, ToastKind::Success, DURATION_DEFAULT);
                self.drafts.clear();
                *lock(&self.form) = FormState::default();
                lock(&self.errors).clear();
                info!(channel = %receipt.channel, "contact form submitted");
                SubmitOutcome::Delivered { toast, receipt }
            }
            Err(error) => {
                let duration = match &error {
                    DeliveryError::Configuration(ConfigurationError::NotConfigured) => {
                        DURATION_LONG
                    }
                    _ => DURATION_DEFAULT,
                };
                let toast = self
                    .toasts
                    .push(error.user_message(), ToastKind::Error, duration);
                SubmitOutcome::Failed { toast, error }
            }
        }
    }

    /// Current form values.
    pub fn form(&self) -> FormState {
        lock(&self.form).clone()
    }

    /// Current per-field errors.
    pub fn errors(&self) -> ValidationErrors {
        lock(&self.errors).clone()
    }

    /// Field a renderer should focus after a validation block.
    pub fn first_invalid_field(&self) -> Option<Field> {
        lock(&self.errors).keys().next().copied()
    }

    /// Message length counter.
    pub fn message_counter(&self) -> MessageCounter {
        let len = lock(&self.form).message.chars().count();
        MessageCounter {
            len,
            max: MESSAGE_MAX,
            near_limit: len.saturating_mul(10) > MESSAGE_MAX.saturating_mul(9),
        }
    }

    /// Notification queue for rendering and dismissal.
    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Dismiss a notification.
    pub fn dismiss_toast(&self, id: ToastId) {
        self.toasts.remove(id);
    }

    /// Channel submissions go through, if any.
    pub fn active_channel(&self) -> Option<Channel> {
        self.router.active_channel()
    }

    /// Deliveries currently awaiting a channel reply. Informational only;
    /// it never blocks a submission.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
