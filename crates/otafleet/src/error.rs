//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing diagnostics with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use otafleet_core::{CoreError, StoreError};

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach the server")]
    #[diagnostic(
        code(otafleet::connection_failed),
        help(
            "Check that the OTA server is running and that the --server\n\
             flag or profile URL points at it."
        )
    )]
    ConnectionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // ── Authentication ───────────────────────────────────────────────

    #[error("The server rejected the API key: {message}")]
    #[diagnostic(
        code(otafleet::auth_failed),
        help(
            "Store a valid key with: otafleet config set-key\n\
             Or pass one directly with --api-key / OTAFLEET_API_KEY."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(otafleet::not_found),
        help("Run: otafleet {list_command} to see available entries")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(otafleet::api_error))]
    ApiError { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(otafleet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(otafleet::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: otafleet config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(otafleet::no_config),
        help(
            "Create a config with: otafleet config init\n\
             Or pass --server <URL>. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Could not persist credential: {reason}")]
    #[diagnostic(
        code(otafleet::credential),
        help("The system keyring may be unavailable; try --api-key for a one-off run.")
    )]
    Credential { reason: String },

    #[error(transparent)]
    #[diagnostic(code(otafleet::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(otafleet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Aborted: {action}")]
    #[diagnostic(code(otafleet::aborted))]
    Aborted { action: String },

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(otafleet::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::NoConfig { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Error mappings ───────────────────────────────────────────────────

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        if err.is_auth() {
            CliError::AuthFailed {
                message: err.message().to_owned(),
            }
        } else if err.is_connection() {
            CliError::ConnectionFailed {
                source: err.api_error().to_string().into(),
            }
        } else {
            CliError::ApiError {
                message: err.message().to_owned(),
            }
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Credential(e) => CliError::Credential {
                reason: e.to_string(),
            },
            CoreError::Api(e) => CliError::ApiError {
                message: e.to_string(),
            },
        }
    }
}

impl From<otafleet_config::ConfigError> for CliError {
    fn from(err: otafleet_config::ConfigError) -> Self {
        match err {
            otafleet_config::ConfigError::Validation { field, reason } => {
                CliError::Validation { field, reason }
            }
            otafleet_config::ConfigError::Figment(e) => CliError::Config(e),
            otafleet_config::ConfigError::Io(e) => CliError::Io(e),
            otafleet_config::ConfigError::Serialization(e) => CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            },
        }
    }
}

impl From<otafleet_core::PersistError> for CliError {
    fn from(err: otafleet_core::PersistError) -> Self {
        CliError::Credential {
            reason: err.to_string(),
        }
    }
}
