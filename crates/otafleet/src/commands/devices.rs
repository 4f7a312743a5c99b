//! Device command handlers.

use std::sync::Arc;

use tabled::Tabled;

use otafleet_core::{Console, Device, DeviceCreateRequest};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Device ID")]
    device_id: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Arc<Device>> for DeviceRow {
    fn from(d: &Arc<Device>) -> Self {
        Self {
            mac: d.mac.clone(),
            device_id: d.device_id().unwrap_or("-").to_owned(),
            target: d.target_version().unwrap_or("-").to_owned(),
            current: d.current_version().unwrap_or("-").to_owned(),
            status: d.status().unwrap_or("unknown").to_owned(),
        }
    }
}

fn detail(d: &Arc<Device>) -> String {
    let mut lines = vec![format!("MAC:      {}", d.mac)];
    for (key, value) in &d.fields {
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
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let devices = console.devices();

    match args.command {
        DevicesCommand::List => {
            devices.refresh().await;
            util::ensure_synced(devices.error())?;

            let snapshot = devices.snapshot();
            let rendered = output::render_list(
                &global.output,
                &snapshot,
                |d| DeviceRow::from(d),
                |d| d.mac.clone(),
            );
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        DevicesCommand::Show { mac } => {
            devices.refresh().await;
            util::ensure_synced(devices.error())?;

            let device = devices.get(&mac).ok_or_else(|| CliError::NotFound {
                resource_type: "device".into(),
                identifier: mac.clone(),
                list_command: "devices list".into(),
            })?;

            let rendered =
                output::render_single(&global.output, &device, |d| detail(d), |d| d.mac.clone());
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        DevicesCommand::Add {
            mac,
            fields,
            from_file,
        } => {
            let fields = util::collect_fields(&fields, from_file.as_deref())?;
            let created = devices
                .create(DeviceCreateRequest {
                    mac_address: mac,
                    fields,
                })
                .await?;

            util::note_success(&format!("Device {} registered", created.mac_address), global);

            // The store already refetched; show the server's copy.
            if let Some(device) = devices.get(&created.mac_address) {
                let rendered = output::render_single(
                    &global.output,
                    &device,
                    |d| detail(d),
                    |d| d.mac.clone(),
                );
                output::print_output(&rendered, global.quiet);
            }
            Ok(())
        }

        DevicesCommand::Update {
            mac,
            fields,
            from_file,
        } => {
            let fields = util::collect_fields(&fields, from_file.as_deref())?;
            devices.update(&mac, fields).await?;

            util::note_success(&format!("Device {mac} updated"), global);

            if let Some(device) = devices.get(&mac) {
                let rendered = output::render_single(
                    &global.output,
                    &device,
                    |d| detail(d),
                    |d| d.mac.clone(),
                );
                output::print_output(&rendered, global.quiet);
            }
            Ok(())
        }

        DevicesCommand::Delete { mac } => {
            util::confirm(&format!("Delete device {mac}"), global)?;
            devices.delete(&mac).await?;

            util::note_success(&format!("Device {mac} deleted"), global);
            Ok(())
        }
    }
}
