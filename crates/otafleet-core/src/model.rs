// ── Domain model ──
//
// Records mirror the server's collections. The server owns the field
// set for both record kinds; only the unique key is lifted into a typed
// field, everything else passes through as JSON.

use serde::Serialize;

use otafleet_api::types::{FieldMap, FirmwareRecord};

/// A fleet device, keyed by MAC address.
///
/// The wire format keys the device list by MAC; the store injects that
/// key as `mac` when expanding the mapping into records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    pub mac: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Device {
    /// A string-valued server field, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn device_id(&self) -> Option<&str> {
        self.field_str("device_id")
    }

    pub fn target_version(&self) -> Option<&str> {
        self.field_str("target_version")
    }

    pub fn current_version(&self) -> Option<&str> {
        self.field_str("current_version")
    }

    pub fn status(&self) -> Option<&str> {
        self.field_str("status")
    }
}

/// A firmware image on the server, keyed by filename.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmwareFile {
    pub filename: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl FirmwareFile {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }

    pub fn checksum(&self) -> Option<&str> {
        self.field_str("checksum")
    }

    pub fn size(&self) -> Option<u64> {
        self.fields.get("size").and_then(serde_json::Value::as_u64)
    }

    pub fn uploaded_at(&self) -> Option<&str> {
        self.field_str("uploaded_at")
    }
}

impl From<FirmwareRecord> for FirmwareFile {
    fn from(record: FirmwareRecord) -> Self {
        Self {
            filename: record.filename,
            fields: record.extra,
        }
    }
}
