//! Config subcommand handlers.

use std::sync::Arc;

use dialoguer::{Input, Select};

use otafleet_config::{Config, Profile, ProfileCredentials};
use otafleet_core::CredentialStore;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{active_profile_name, config_path, load_config_or_default, save_config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Store an API key through the credential store's write-through port.
fn store_key(profile_name: &str, key: &str) -> Result<(), CliError> {
    let store = CredentialStore::new(Arc::new(ProfileCredentials::keyring_only(profile_name)));
    store.set(key)?;
    Ok(())
}

fn render_config(cfg: &Config, format: &OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table | OutputFormat::Plain => {
            toml::to_string_pretty(cfg).map_err(|e| CliError::Validation {
                field: "config".into(),
                reason: format!("failed to serialize config: {e}"),
            })?
        }
        OutputFormat::Json => output::render_json_pretty(cfg),
        OutputFormat::JsonCompact => output::render_json_compact(cfg),
        OutputFormat::Yaml => output::render_yaml(cfg),
    })
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config_path();
            eprintln!("otafleet — configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            // 1. Profile name
            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 2. Server URL
            let server: String = Input::new()
                .with_prompt("Server URL")
                .default("http://192.168.1.50:8000".into())
                .interact_text()
                .map_err(prompt_err)?;

            // 3. API key
            let key = rpassword::prompt_password("Admin API key (empty to skip): ")
                .map_err(prompt_err)?;

            let api_key_field = if key.is_empty() {
                None
            } else {
                let store_choices = &[
                    "Store in system keyring (recommended)",
                    "Save to config file (plaintext)",
                ];
                let store_selection = Select::new()
                    .with_prompt("Where to store the API key?")
                    .items(store_choices)
                    .default(0)
                    .interact()
                    .map_err(prompt_err)?;

                if store_selection == 0 {
                    store_key(&profile_name, &key)?;
                    eprintln!("   ✓ API key stored in system keyring");
                    None // Don't write to config file
                } else {
                    Some(key)
                }
            };

            // 4. Build profile and save
            let mut cfg = load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    server,
                    api_key: api_key_field,
                    api_key_env: None,
                    ca_cert: None,
                    insecure: if global.insecure { Some(true) } else { None },
                    timeout: None,
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            save_config(&cfg)?;

            util::note_success(
                &format!("Profile '{profile_name}' saved to {}", path.display()),
                global,
            );
            Ok(())
        }

        // ── Show / Path / Profiles ──────────────────────────────────
        ConfigCommand::Show => {
            let cfg = load_config_or_default();
            let rendered = render_config(&cfg, &global.output)?;
            output::print_output(rendered.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("");

            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort_unstable();

            let rendered = names
                .iter()
                .map(|name| {
                    if name.as_str() == default {
                        format!("{name} (default)")
                    } else {
                        (*name).to_string()
                    }
                })
                .collect::<Vec<_>>()
                .join("\n");
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
                available.sort_unstable();
                return Err(CliError::ProfileNotFound {
                    name,
                    available: available.join(", "),
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config(&cfg)?;

            util::note_success(&format!("Default profile set to '{name}'"), global);
            Ok(())
        }

        // ── SetKey: write-through to the keyring ────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| active_profile_name(global, &cfg));

            let key = rpassword::prompt_password("Admin API key: ").map_err(prompt_err)?;
            if key.is_empty() {
                return Err(CliError::Validation {
                    field: "api_key".into(),
                    reason: "API key cannot be empty".into(),
                });
            }

            store_key(&profile_name, &key)?;
            util::note_success(
                &format!("API key stored in keyring for profile '{profile_name}'"),
                global,
            );
            Ok(())
        }
    }
}
