// ── Core error types ──
//
// `StoreError` is what mutation operations hand back to their immediate
// caller: the same normalized message that was written into the store's
// observable error slot, with the transport-level failure attached as
// source. Read failures never surface here — they are absorbed into
// store state.

use thiserror::Error;

use crate::credential::PersistError;

/// Failure of a store mutation, carrying the normalized message.
///
/// The message is the server's `error` field when the response had one,
/// otherwise the operation's fixed fallback text — identical to what
/// observers of the store's error state see.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    #[source]
    source: otafleet_api::Error,
}

impl StoreError {
    pub(crate) fn new(message: String, source: otafleet_api::Error) -> Self {
        Self { message, source }
    }

    /// The normalized, user-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The underlying API failure.
    pub fn api_error(&self) -> &otafleet_api::Error {
        &self.source
    }

    /// Returns `true` if the server rejected the API key.
    pub fn is_auth(&self) -> bool {
        self.source.is_auth()
    }

    /// Returns `true` if the targeted record does not exist server-side.
    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }

    /// Returns `true` if the request never reached the server.
    pub fn is_connection(&self) -> bool {
        self.source.is_transient()
    }
}

/// Unified error type for console construction and credential handling.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Credential(#[from] PersistError),

    #[error(transparent)]
    Api(#[from] otafleet_api::Error),
}
