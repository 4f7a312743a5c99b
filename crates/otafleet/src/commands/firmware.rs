//! Firmware command handlers.

use std::sync::Arc;

use bytesize::ByteSize;
use tabled::Tabled;

use otafleet_core::{Console, FirmwareFile};

use crate::cli::{FirmwareArgs, FirmwareCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct FirmwareRow {
    #[tabled(rename = "Filename")]
    filename: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
    #[tabled(rename = "Uploaded")]
    uploaded: String,
}

impl From<&Arc<FirmwareFile>> for FirmwareRow {
    fn from(f: &Arc<FirmwareFile>) -> Self {
        Self {
            filename: f.filename.clone(),
            size: f.size().map_or_else(|| "-".into(), |s| ByteSize(s).to_string()),
            checksum: f.checksum().unwrap_or("-").to_owned(),
            uploaded: f.uploaded_at().unwrap_or("-").to_owned(),
        }
    }
}

fn detail(f: &Arc<FirmwareFile>) -> String {
    let mut lines = vec![format!("Filename: {}", f.filename)];
    for (key, value) in &f.fields {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        lines.push(format!("{key}: {rendered}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    console: &Console,
    args: FirmwareArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let firmware = console.firmware();

    match args.command {
        FirmwareCommand::List => {
            firmware.refresh().await;
            util::ensure_synced(firmware.error())?;

            let snapshot = firmware.snapshot();
            let rendered = output::render_list(
                &global.output,
                &snapshot,
                |f| FirmwareRow::from(f),
                |f| f.filename.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        FirmwareCommand::Show { filename } => {
            firmware.refresh().await;
            util::ensure_synced(firmware.error())?;

            let file = firmware.get(&filename).ok_or_else(|| CliError::NotFound {
                resource_type: "firmware file".into(),
                identifier: filename.clone(),
                list_command: "firmware list".into(),
            })?;

            let rendered = output::render_single(
                &global.output,
                &file,
                |f| detail(f),
                |f| f.filename.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        FirmwareCommand::Upload { path, name } => {
            let filename = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(str::to_owned)
                    .ok_or_else(|| CliError::Validation {
                        field: "path".into(),
                        reason: format!("cannot derive a filename from '{}'", path.display()),
                    })?,
            };

            let contents = tokio::fs::read(&path).await?;
            let uploaded = firmware.upload(&filename, contents).await?;

            util::note_success(&format!("Firmware {} uploaded", uploaded.filename), global);

            if let Some(file) = firmware.get(&uploaded.filename) {
                let rendered = output::render_single(
                    &global.output,
                    &file,
                    |f| detail(f),
                    |f| f.filename.clone(),
                );
                output::print_output(&rendered, global.quiet);
            }
            Ok(())
        }

        FirmwareCommand::Delete { filename } => {
            util::confirm(&format!("Delete firmware {filename}"), global)?;
            firmware.delete(&filename).await?;

            util::note_success(&format!("Firmware {filename} deleted"), global);
            Ok(())
        }
    }
}
