//! Shared configuration for the OTA fleet CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `otafleet_core::ConsoleConfig`. The credential
//! chain is packaged as a [`CredentialPersister`] so the core store
//! reads and writes durable storage through one port.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use otafleet_core::{ConsoleConfig, CredentialPersister, PersistError, TlsVerification};

/// Keyring service name for stored API keys.
pub const KEYRING_SERVICE: &str = "otafleet";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named server profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Admin server base URL (e.g., "http://192.168.1.50:8000").
    pub server: String,

    /// API key (plaintext — prefer keyring or env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "otafleet", "otafleet").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("otafleet");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let path = config_path();

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("OTAFLEET_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Credential persistence ──────────────────────────────────────────

/// A profile's API-key storage, as seen by the credential store.
///
/// Reads resolve through the chain: profile's `api_key_env` env var,
/// then the system keyring entry `<profile>/api-key`, then the
/// plaintext `api_key` field. Writes always target the keyring —
/// plaintext config is an input convenience, never an output.
pub struct ProfileCredentials {
    profile: String,
    env_var: Option<String>,
    plaintext: Option<String>,
}

impl ProfileCredentials {
    pub fn for_profile(profile: &Profile, profile_name: &str) -> Self {
        Self {
            profile: profile_name.to_owned(),
            env_var: profile.api_key_env.clone(),
            plaintext: profile.api_key.clone(),
        }
    }

    /// A persister for a profile name alone (no plaintext fallback).
    ///
    /// Used by `config set-key` before any profile fields are known.
    pub fn keyring_only(profile_name: &str) -> Self {
        Self {
            profile: profile_name.to_owned(),
            env_var: None,
            plaintext: None,
        }
    }

    fn keyring_entry(&self) -> Result<keyring::Entry, PersistError> {
        keyring::Entry::new(KEYRING_SERVICE, &format!("{}/api-key", self.profile))
            .map_err(|e| PersistError::new(format!("failed to access keyring: {e}")))
    }
}

impl CredentialPersister for ProfileCredentials {
    fn load(&self) -> Result<Option<String>, PersistError> {
        // 1. Profile's api_key_env → env var lookup
        if let Some(ref env_name) = self.env_var {
            if let Ok(val) = std::env::var(env_name) {
                return Ok(Some(val));
            }
        }

        // 2. System keyring (any failure falls through to plaintext)
        if let Ok(entry) = self.keyring_entry() {
            if let Ok(secret) = entry.get_password() {
                return Ok(Some(secret));
            }
        }

        // 3. Plaintext in config
        Ok(self.plaintext.clone())
    }

    fn store(&self, value: &str) -> Result<(), PersistError> {
        let entry = self.keyring_entry()?;
        entry
            .set_password(value)
            .map_err(|e| PersistError::new(format!("failed to store API key in keyring: {e}")))
    }
}

/// Resolve an API key through the same chain without building a store.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    ProfileCredentials::for_profile(profile, profile_name)
        .load()
        .ok()
        .flatten()
        .map(SecretString::from)
}

// ── Console config translation ──────────────────────────────────────

/// Build a `ConsoleConfig` from a profile.
pub fn profile_to_console_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ConsoleConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    Ok(ConsoleConfig { url, tls, timeout })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            api_key: None,
            api_key_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }

    #[test]
    fn default_config_has_default_profile() {
        let cfg = Config::default();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut cfg = Config::default();
        cfg.profiles
            .insert("lab".into(), profile("http://10.0.0.5:8000"));

        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.profiles["lab"].server, "http://10.0.0.5:8000");
    }

    #[test]
    fn profile_translates_to_console_config() {
        let mut p = profile("http://192.168.1.50:8000");
        p.timeout = Some(10);

        let cfg = profile_to_console_config(&p, &Defaults::default()).unwrap();

        assert_eq!(cfg.url.as_str(), "http://192.168.1.50:8000/");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn insecure_profile_disables_verification() {
        let mut p = profile("https://192.168.1.50");
        p.insecure = Some(true);

        let cfg = profile_to_console_config(&p, &Defaults::default()).unwrap();
        assert_eq!(cfg.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let result = profile_to_console_config(&profile("not a url"), &Defaults::default());
        assert!(matches!(
            result,
            Err(ConfigError::Validation { ref field, .. }) if field == "server"
        ));
    }

    #[test]
    fn plaintext_api_key_is_last_resort() {
        let mut p = profile("http://localhost:8000");
        p.api_key = Some("plain-key".into());

        // No env var configured and nothing in the keyring for this
        // throwaway profile name, so the chain lands on plaintext.
        let creds = ProfileCredentials::for_profile(&p, "otafleet-test-nonexistent");
        assert_eq!(creds.load().unwrap().as_deref(), Some("plain-key"));
    }
}
