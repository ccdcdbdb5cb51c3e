//! Transient outcome notifications.
//!
//! Each entry walks `Visible -> Closing -> Removed`. Expiry and manual
//! dismissal both lead into `Closing`, which always lasts [`EXIT_DURATION`]
//! before the entry is dropped. Every entry owns its own timer task; the
//! queue holds the abort handles so dismissal and teardown can cancel them
//! without touching any other entry's schedule.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// How long an entry stays in `Closing` before removal.
pub const EXIT_DURATION: Duration = Duration::from_millis(300);

/// Display duration for brief notices (rate-limit and validation blocks).
pub const DURATION_SHORT: Duration = Duration::from_millis(2000);
/// Display duration for ordinary outcomes.
pub const DURATION_DEFAULT: Duration = Duration::from_millis(3000);
/// Display duration for setup problems the reader needs time to take in.
pub const DURATION_LONG: Duration = Duration::from_millis(5000);

/// Unique notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ToastId(Uuid);

impl fmt::Display for ToastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    /// Message delivered.
    Success,
    /// User-correctable problem.
    Warning,
    /// Blocked or failed attempt.
    Error,
}

/// Lifecycle phase of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPhase {
    /// Shown normally.
    Visible,
    /// Playing its exit transition.
    Closing,
    /// Gone from the queue.
    Removed,
}

/// A queued notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastEntry {
    /// Unique id returned by [`ToastQueue::push`].
    pub id: ToastId,
    /// Text shown to the user.
    pub message: String,
    /// Severity.
    pub kind: ToastKind,
    /// Time spent visible before closing; zero means until dismissed.
    pub duration: Duration,
    /// Current lifecycle phase.
    pub phase: ToastPhase,
    /// When the entry was pushed.
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct QueueState {
    entries: Vec<ToastEntry>,
    timers: HashMap<ToastId, JoinHandle<()>>,
}

struct Shared {
    state: Mutex<QueueState>,
    updates: watch::Sender<Vec<ToastEntry>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &QueueState) {
        self.updates.send_replace(state.entries.clone());
    }

    /// Move a visible entry into `Closing`. Returns false when the entry is
    /// gone or already closing.
    fn begin_closing(&self, state: &mut QueueState, id: ToastId) -> bool {
        let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if entry.phase != ToastPhase::Visible {
            return false;
        }
        entry.phase = ToastPhase::Closing;
        self.publish(state);
        true
    }

    fn finish(&self, id: ToastId) {
        let mut state = self.lock();
        state.timers.remove(&id);
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        if state.entries.len() != before {
            debug!(toast = %id, "toast removed");
            self.publish(&state);
        }
    }
}

/// Ordered queue of notifications with self-expiring entries.
///
/// Timers run on the ambient tokio runtime. Dropping the queue cancels
/// every outstanding timer.
pub struct ToastQueue {
    shared: Arc<Shared>,
}

impl fmt::Debug for ToastQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("ToastQueue")
            .field("entries", &state.entries)
            .field("pending_timers", &state.timers.len())
            .finish()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                updates,
            }),
        }
    }

    /// Append a visible entry and schedule its expiry when `duration` is
    /// non-zero.
    pub fn push(&self, message: impl Into<String>, kind: ToastKind, duration: Duration) -> ToastId {
        let id = ToastId(Uuid::new_v4());
        let entry = ToastEntry {
            id,
            message: message.into(),
            kind,
            duration,
            phase: ToastPhase::Visible,
            created_at: Utc::now(),
        };
        debug!(toast = %id, kind = ?kind, duration_ms = duration.as_millis(), "toast pushed");

        let mut state = self.shared.lock();
        state.entries.push(entry);
        if !duration.is_zero() {
            if let Some(handle) = self.spawn_expiry(id, duration) {
                state.timers.insert(id, handle);
            }
        }
        self.shared.publish(&state);
        id
    }

    /// Dismiss an entry. A visible entry starts its exit transition
    /// immediately; anything else is left alone.
    pub fn remove(&self, id: ToastId) {
        let mut state = self.shared.lock();
        if let Some(handle) = state.timers.get(&id) {
            let is_visible = state
                .entries
                .iter()
                .any(|e| e.id == id && e.phase == ToastPhase::Visible);
            if !is_visible {
                return;
            }
            handle.abort();
            state.timers.remove(&id);
        }
        if !self.shared.begin_closing(&mut state, id) {
            return;
        }
        debug!(toast = %id, "toast dismissed");
        if let Some(handle) = self.spawn_exit(id) {
            state.timers.insert(id, handle);
        }
    }

    /// Snapshot of the current entries, oldest first.
    pub fn entries(&self) -> Vec<ToastEntry> {
        self.shared.lock().entries.clone()
    }

    /// Current phase of `id`. Ids no longer queued report `Removed`.
    pub fn phase(&self, id: ToastId) -> ToastPhase {
        self.shared
            .lock()
            .entries
            .iter()
            .find(|e| e.id == id)
            .map_or(ToastPhase::Removed, |e| e.phase)
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.shared.lock().entries.len()
    }

    /// Returns true when no entries are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receive a fresh snapshot every time the queue changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ToastEntry>> {
        self.shared.updates.subscribe()
    }

    /// Number of timers still scheduled.
    pub fn pending_timers(&self) -> usize {
        self.shared.lock().timers.len()
    }

    /// Cancel every outstanding timer. Entries stay where they are.
    pub fn teardown(&self) {
        let mut state = self.shared.lock();
        for (_, handle) in state.timers.drain() {
            handle.abort();
        }
    }

    fn spawn_expiry(&self, id: ToastId, duration: Duration) -> Option<JoinHandle<()>> {
        let shared = Arc::downgrade(&self.shared);
        spawn_timer(async move {
            tokio::time::sleep(duration).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            {
                let mut state = shared.lock();
                if !shared.begin_closing(&mut state, id) {
                    return;
                }
            }
            let weak = Arc::downgrade(&shared);
            drop(shared);
            run_exit(weak, id).await;
        })
    }

    fn spawn_exit(&self, id: ToastId) -> Option<JoinHandle<()>> {
        spawn_timer(run_exit(Arc::downgrade(&self.shared), id))
    }
}

impl Drop for ToastQueue {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run_exit(shared: Weak<Shared>, id: ToastId) {
    tokio::time::sleep(EXIT_DURATION).await;
    if let Some(shared) = shared.upgrade() {
        shared.finish(id);
    }
}

fn spawn_timer<F>(task: F) -> Option<JoinHandle<()>>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Some(handle.spawn(task)),
        Err(e) => {
            warn!(error = %e, "no async runtime, toast will not expire");
            None
        }
    }
}
