// Wire types for the admin API.
//
// Device and firmware metadata are deliberately loose: the server owns
// the field set, and everything except the record key passes through as
// untyped JSON. Only the envelope fields the client itself needs are
// typed.

use serde::{Deserialize, Serialize};

/// Opaque server-defined fields of a record, passed through verbatim.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

// ── Devices ──────────────────────────────────────────────────────────

/// Request body for `POST /admin/api/devices`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceCreateRequest {
    pub mac_address: String,
    #[serde(flatten)]
    pub fields: FieldMap,
}

/// Response body of a successful device creation.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCreated {
    #[serde(default)]
    pub success: bool,
    pub mac_address: String,
    #[serde(default)]
    pub device: FieldMap,
}

/// Response body of a successful device update.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceUpdated {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub device: FieldMap,
}

// ── Firmware ─────────────────────────────────────────────────────────

/// A firmware file record as listed by the server.
///
/// `filename` is the unique key; checksum, size, upload date and any
/// future fields stay in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirmwareRecord {
    pub filename: String,
    #[serde(flatten)]
    pub extra: FieldMap,
}

/// Response body of a successful firmware upload.
#[derive(Debug, Clone, Deserialize)]
pub struct FirmwareUploaded {
    pub filename: String,
    #[serde(default)]
    pub success: bool,
    #[serde(flatten)]
    pub extra: FieldMap,
}

// ── Shared ───────────────────────────────────────────────────────────

/// Confirmation body returned by delete endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub success: bool,
}
