//! Draft persistence for in-progress form content.
//!
//! The draft lives under a single key in a [`KeyValueStore`]. Every
//! [`DraftStore`] operation is infallible from the caller's point of view:
//! storage and encoding failures are logged and swallowed so they never
//! interfere with typing or submitting.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::validation::FormState;

/// Storage key the draft is written under.
pub const DRAFT_KEY: &str = "contactFormData";

/// Key-value storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying filesystem failure.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Storage backend is not usable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Key cannot be mapped onto the backend.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Minimal string key-value storage used for drafts.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_owned()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Can be flipped into a failing mode to stand in for
/// storage that is full or disabled.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    unavailable: bool,
}

impl MemoryStore {
    /// Create an empty, working store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every operation fails.
    pub fn unavailable() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            unavailable: true,
        }
    }

    fn entries(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("storage disabled".to_owned()));
        }
        self.entries
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory store lock poisoned: {e}")))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Draft store
// ---------------------------------------------------------------------------

/// Persists the current [`FormState`] snapshot under [`DRAFT_KEY`].
pub struct DraftStore {
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for DraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftStore")
            .field("key", &DRAFT_KEY)
            .finish_non_exhaustive()
    }
}

impl DraftStore {
    /// Wrap a storage backend.
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Draft store backed by a [`FileStore`] in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(dir))
    }

    /// Overwrite the persisted snapshot with `form`.
    pub fn save(&self, form: &FormState) {
        let encoded = match serde_json::to_string(form) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "failed to encode form draft");
                return;
            }
        };
        if let Err(e) = self.store.set(DRAFT_KEY, &encoded) {
            warn!(error = %e, "failed to save form draft");
        }
    }

    /// Load the persisted snapshot, or an empty form when there is none
    /// or it cannot be read.
    pub fn load(&self) -> FormState {
        let raw = match self.store.get(DRAFT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return FormState::default(),
            Err(e) => {
                warn!(error = %e, "failed to load form draft");
                return FormState::default();
            }
        };
        match serde_json::from_str::<FormState>(&raw) {
            Ok(form) => {
                debug!("restored form draft");
                form
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable form draft");
                FormState::default()
            }
        }
    }

    /// Remove the persisted snapshot.
    pub fn clear(&self) {
        if let Err(e) = self.store.remove(DRAFT_KEY) {
            warn!(error = %e, "failed to clear form draft");
        }
    }
}
