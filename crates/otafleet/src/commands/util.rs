//! Shared helpers for command handlers.

use std::io::{IsTerminal, Read};
use std::path::Path;

use dialoguer::Confirm;
use owo_colors::OwoColorize;

use otafleet_core::FieldMap;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Parse a `key=value` flag into a JSON field.
///
/// The value side parses as JSON when it looks like JSON (numbers,
/// booleans, null, quoted strings, arrays), otherwise it is taken as a
/// plain string — so `--field target_version=1.2.0` stays a string
/// while `--field retries=3` becomes a number.
pub fn parse_field(arg: &str) -> Result<(String, serde_json::Value), CliError> {
    let Some((key, value)) = arg.split_once('=') else {
        return Err(CliError::Validation {
            field: "field".into(),
            reason: format!("expected KEY=VALUE, got '{arg}'"),
        });
    };

    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));

    Ok((key.to_owned(), value))
}

/// Build a field map from repeated `--field` flags and/or a JSON file.
///
/// File contents load first; explicit `--field` flags override them.
pub fn collect_fields(
    field_args: &[String],
    from_file: Option<&Path>,
) -> Result<FieldMap, CliError> {
    let mut fields = match from_file {
        Some(path) => read_json_object(path)?,
        None => FieldMap::new(),
    };

    for arg in field_args {
        let (key, value) = parse_field(arg)?;
        fields.insert(key, value);
    }

    Ok(fields)
}

/// Read a JSON object from a file, or stdin when the path is `-`.
fn read_json_object(path: &Path) -> Result<FieldMap, CliError> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };

    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(CliError::Validation {
            field: "from-file".into(),
            reason: "expected a JSON object".into(),
        }),
    }
}

/// Fail if a store refresh left an error behind.
///
/// Read failures are absorbed into store state rather than returned, so
/// commands that render a collection check here after refreshing.
pub fn ensure_synced(error: Option<String>) -> Result<(), CliError> {
    match error {
        Some(message) => Err(CliError::ApiError { message }),
        None => Ok(()),
    }
}

/// Confirm a destructive action, honoring `--yes` and non-tty runs.
pub fn confirm(action: &str, global: &GlobalOpts) -> Result<(), CliError> {
    if global.yes {
        return Ok(());
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.to_owned(),
        });
    }

    let confirmed = Confirm::new()
        .with_prompt(format!("{action}?"))
        .default(false)
        .interact()
        .map_err(|e| CliError::Validation {
            field: "interactive".into(),
            reason: format!("prompt failed: {e}"),
        })?;

    if confirmed {
        Ok(())
    } else {
        Err(CliError::Aborted {
            action: action.to_owned(),
        })
    }
}

/// Print a success note to stderr, colored when appropriate.
pub fn note_success(message: &str, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    if output::should_color(&global.color) {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::parse_field;

    #[test]
    fn plain_values_stay_strings() {
        let (key, value) = parse_field("target_version=1.2.0").unwrap();
        assert_eq!(key, "target_version");
        assert_eq!(value, serde_json::Value::String("1.2.0".into()));
    }

    #[test]
    fn json_values_parse_as_json() {
        let (_, number) = parse_field("retries=3").unwrap();
        assert_eq!(number, serde_json::json!(3));

        let (_, flag) = parse_field("enabled=true").unwrap();
        assert_eq!(flag, serde_json::json!(true));
    }

    #[test]
    fn missing_equals_is_rejected() {
        assert!(parse_field("no-equals-here").is_err());
    }
}
