use thiserror::Error;

/// Top-level error type for the `otafleet-api` crate.
///
/// The admin API reports application failures as a JSON body with an
/// `error` string field. When that field is present it is preserved in
/// [`Error::Api`]; `otafleet-core` decides what to show when it is not.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP response from the admin API.
    ///
    /// `message` is the `error` field of the response body when the
    /// server sent a structured error, `None` otherwise.
    #[error("Admin API error (HTTP {status}): {}", .message.as_deref().unwrap_or("no detail"))]
    Api { status: u16, message: Option<String> },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The server-reported error message, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api {
                message: Some(m), ..
            } => Some(m),
            _ => None,
        }
    }

    /// The HTTP status code, if this failure reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the server rejected the API key.
    pub fn is_auth(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
