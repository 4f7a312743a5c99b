// ── Credential store ──
//
// Holds the one API key shared by every store, persists it through an
// injected port, and broadcasts changes over a `watch` channel. Stores
// never write the credential; they subscribe and read it per request.

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

pub use otafleet_api::ADMIN_API_KEY_HEADER;

/// Failure writing to or reading from durable credential storage.
#[derive(Debug, Error)]
#[error("credential persistence failed: {reason}")]
pub struct PersistError {
    reason: String,
}

impl PersistError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Durable storage port for the API key.
///
/// The store writes through on every `set`; implementations decide
/// where the value lives (system keyring, config file, memory).
pub trait CredentialPersister: Send + Sync {
    /// Read the persisted value, `None` if nothing was ever stored.
    fn load(&self) -> Result<Option<String>, PersistError>;

    /// Durably store the value.
    fn store(&self, value: &str) -> Result<(), PersistError>;
}

/// In-memory persister: survives nothing, fails never.
///
/// Used by tests and by ephemeral runs where the key arrives on the
/// command line and should not be written anywhere.
#[derive(Debug, Default)]
pub struct MemoryPersister {
    value: Mutex<Option<String>>,
}

impl MemoryPersister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start pre-seeded with a value, as if it had been stored before.
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl CredentialPersister for MemoryPersister {
    fn load(&self) -> Result<Option<String>, PersistError> {
        let guard = self
            .value
            .lock()
            .map_err(|_| PersistError::new("memory persister poisoned"))?;
        Ok(guard.clone())
    }

    fn store(&self, value: &str) -> Result<(), PersistError> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| PersistError::new("memory persister poisoned"))?;
        *guard = Some(value.to_owned());
        Ok(())
    }
}

/// Observable holder of the admin API key.
///
/// The empty string means "unauthenticated"; the server is the sole
/// authority on validity, so no shape checks happen here. One instance
/// exists per [`Console`](crate::Console) — constructed explicitly, no
/// global state.
pub struct CredentialStore {
    current: watch::Sender<String>,
    persister: Arc<dyn CredentialPersister>,
}

impl CredentialStore {
    /// Create the store, reading the persisted value if present.
    ///
    /// A load failure is not fatal: the store starts unauthenticated
    /// and the next `set` writes through normally.
    pub fn new(persister: Arc<dyn CredentialPersister>) -> Self {
        let initial = match persister.load() {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "could not load persisted credential");
                String::new()
            }
        };
        let (current, _) = watch::channel(initial);

        Self { current, persister }
    }

    /// Convenience constructor backed by a [`MemoryPersister`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersister::new()))
    }

    /// The current credential value.
    pub fn get(&self) -> String {
        self.current.borrow().clone()
    }

    /// Replace the credential.
    ///
    /// The new value is broadcast to all subscribers before this
    /// returns; the write-through to durable storage happens after the
    /// broadcast, so readers are never blocked on (or failed by) the
    /// storage backend.
    pub fn set(&self, value: impl Into<String>) -> Result<(), PersistError> {
        let value = value.into();
        self.current.send_replace(value.clone());
        self.persister.store(&value)
    }

    /// Subscribe to credential changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    /// The authorization header for the current credential, read fresh.
    pub fn auth_header(&self) -> (&'static str, String) {
        (ADMIN_API_KEY_HEADER, self.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_without_persisted_value() {
        let store = CredentialStore::in_memory();
        assert_eq!(store.get(), "");
        assert_eq!(store.auth_header(), (ADMIN_API_KEY_HEADER, String::new()));
    }

    #[test]
    fn reads_persisted_value_at_construction() {
        let persister = Arc::new(MemoryPersister::with_value("stored-key"));
        let store = CredentialStore::new(persister);
        assert_eq!(store.get(), "stored-key");
    }

    #[test]
    fn set_broadcasts_before_returning() {
        let store = CredentialStore::in_memory();
        let rx = store.subscribe();

        store.set("secret123").unwrap();

        // No await between set and read: the value is already visible.
        assert_eq!(*rx.borrow(), "secret123");
        assert_eq!(store.auth_header().1, "secret123");
    }

    #[test]
    fn set_writes_through_to_persister() {
        let persister = Arc::new(MemoryPersister::new());
        let store = CredentialStore::new(Arc::clone(&persister) as Arc<dyn CredentialPersister>);

        store.set("secret123").unwrap();

        assert_eq!(persister.load().unwrap().as_deref(), Some("secret123"));
    }

    #[test]
    fn latest_set_wins() {
        let store = CredentialStore::in_memory();
        store.set("first").unwrap();
        store.set("second").unwrap();
        assert_eq!(store.get(), "second");
    }
}
