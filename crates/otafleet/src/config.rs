//! Profile resolution and console construction for the CLI.
//!
//! Thin glue over `otafleet-config`: picks the active profile, applies
//! CLI flag overrides, and chooses how the credential store persists
//! (ephemeral memory for `--api-key`, the keyring chain otherwise).

use std::sync::Arc;
use std::time::Duration;

use otafleet_config::{Config, Profile, ProfileCredentials};
use otafleet_core::{
    Console, ConsoleConfig, CredentialPersister, MemoryPersister, TlsVerification,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use otafleet_config::{config_path, load_config_or_default, save_config};

/// The profile name to use: `--profile`, else the config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the console from config file, profile, and CLI overrides.
pub fn build_console(global: &GlobalOpts) -> Result<Console, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        tracing::debug!(profile = %profile_name, "using configured profile");
        let console_config = resolve_profile(profile, global, &cfg)?;
        let persister = persister_for(global, Some(profile), &profile_name);
        return Ok(Console::new(console_config, persister)?);
    }

    // No profile found — a server URL from flags/env is required.
    let Some(server) = global.server.as_deref() else {
        if global.profile.is_some() {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    };

    let url: url::Url = server.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })?;

    let console_config = ConsoleConfig {
        url,
        tls: tls_for(global),
        timeout: Duration::from_secs(global.timeout),
    };
    let persister = persister_for(global, None, &profile_name);

    Ok(Console::new(console_config, persister)?)
}

/// Translate a profile, then layer CLI flag overrides on top.
fn resolve_profile(
    profile: &Profile,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<ConsoleConfig, CliError> {
    let mut effective = profile.clone();

    if let Some(ref server) = global.server {
        effective.server.clone_from(server);
    }
    if global.insecure {
        effective.insecure = Some(true);
    }

    let mut console_config =
        otafleet_config::profile_to_console_config(&effective, &cfg.defaults)?;
    console_config.timeout = Duration::from_secs(
        effective.timeout.unwrap_or(global.timeout),
    );

    Ok(console_config)
}

/// Pick the credential persister for this invocation.
///
/// An explicit `--api-key` never touches durable storage; everything
/// else goes through the profile's env/keyring/plaintext chain.
fn persister_for(
    global: &GlobalOpts,
    profile: Option<&Profile>,
    profile_name: &str,
) -> Arc<dyn CredentialPersister> {
    if let Some(ref key) = global.api_key {
        return Arc::new(MemoryPersister::with_value(key.clone()));
    }

    match profile {
        Some(p) => Arc::new(ProfileCredentials::for_profile(p, profile_name)),
        None => Arc::new(ProfileCredentials::keyring_only(profile_name)),
    }
}

fn tls_for(global: &GlobalOpts) -> TlsVerification {
    if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    }
}
