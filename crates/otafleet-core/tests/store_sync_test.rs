// Integration tests for the store layer against a mock admin API.
//
// Exercises the synchronization contract end to end: state ordering
// around operations, refetch-after-write, error normalization, and
// credential propagation into request headers.
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use otafleet_core::{
    Console, ConsoleConfig, DeviceCreateRequest, FieldMap, MemoryPersister, TlsVerification,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn fields(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected JSON object, got: {other:?}"),
    }
}

async fn setup() -> (MockServer, Console) {
    let server = MockServer::start().await;
    let config = ConsoleConfig {
        url: server.uri().parse().unwrap(),
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
    };
    let console = Console::new(config, Arc::new(MemoryPersister::new())).unwrap();
    (server, console)
}

// ── Device fetch ────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_expands_mac_keyed_mapping() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aa:bb:cc:dd:ee:ff": { "name": "sensor1" }
        })))
        .mount(&server)
        .await;

    let devices = console.devices();
    devices.refresh().await;

    let snapshot = devices.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].mac, "aa:bb:cc:dd:ee:ff");
    assert_eq!(snapshot[0].field_str("name"), Some("sensor1"));
    assert!(!devices.loading());
    assert!(devices.error().is_none());
    assert!(devices.last_synced().is_some());
}

#[tokio::test]
async fn refresh_snapshot_is_mac_sorted_without_duplicates() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cc:cc:cc:cc:cc:cc": { "name": "c" },
            "aa:aa:aa:aa:aa:aa": { "name": "a" },
            "bb:bb:bb:bb:bb:bb": { "name": "b" },
        })))
        .mount(&server)
        .await;

    let devices = console.devices();
    devices.refresh().await;

    let snapshot = devices.snapshot();
    let macs: Vec<&str> = snapshot.iter().map(|d| d.mac.as_str()).collect();
    assert_eq!(
        macs,
        vec!["aa:aa:aa:aa:aa:aa", "bb:bb:bb:bb:bb:bb", "cc:cc:cc:cc:cc:cc"]
    );

    let unique: std::collections::HashSet<&str> = macs.iter().copied().collect();
    assert_eq!(unique.len(), macs.len());
}

#[tokio::test]
async fn refresh_failure_keeps_previous_collection() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aa:bb:cc:dd:ee:ff": { "name": "sensor1" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let devices = console.devices();
    devices.refresh().await;
    assert_eq!(devices.len(), 1);

    devices.refresh().await;

    // Stale data stays visible; the failure is recorded with the
    // fixed fallback since the body carried no structured error.
    assert_eq!(devices.len(), 1);
    assert_eq!(devices.error().as_deref(), Some("Failed to fetch devices"));
    assert!(!devices.loading());
}

#[tokio::test]
async fn error_cleared_at_start_of_next_operation() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let devices = console.devices();
    devices.refresh().await;
    assert!(devices.error().is_some());

    devices.refresh().await;
    assert!(devices.error().is_none());
    assert!(!devices.loading());
}

// ── Device mutations ────────────────────────────────────────────────

#[tokio::test]
async fn create_refetches_collection_from_server() {
    let (server, console) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "mac_address": "aa:bb:cc:dd:ee:ff",
            "device": { "name": "sensor1" }
        })))
        .mount(&server)
        .await;

    // The post-write refetch is the only way data enters the store:
    // the response below deliberately differs from the POST echo.
    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aa:bb:cc:dd:ee:ff": { "name": "sensor1", "status": "registered" },
            "11:22:33:44:55:66": { "name": "sensor2" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let devices = console.devices();
    let created = devices
        .create(DeviceCreateRequest {
            mac_address: "aa:bb:cc:dd:ee:ff".into(),
            fields: fields(json!({ "name": "sensor1" })),
        })
        .await
        .unwrap();

    assert!(created.success);
    assert_eq!(created.mac_address, "aa:bb:cc:dd:ee:ff");

    // Collection reflects the fresh fetch, not a local patch.
    assert_eq!(devices.len(), 2);
    let sensor1 = devices.get("aa:bb:cc:dd:ee:ff").unwrap();
    assert_eq!(sensor1.field_str("status"), Some("registered"));
    assert!(!devices.loading());
    assert!(devices.error().is_none());

    server.verify().await;
}

#[tokio::test]
async fn create_failure_sets_error_and_propagates_message() {
    let (server, console) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "mac required" })))
        .mount(&server)
        .await;

    // No GET mock: a failed write must not trigger a refetch.

    let devices = console.devices();
    let result = devices
        .create(DeviceCreateRequest {
            mac_address: String::new(),
            fields: fields(json!({ "name": "x" })),
        })
        .await;

    let err = result.unwrap_err();
    assert_eq!(err.message(), "mac required");
    assert_eq!(devices.error().as_deref(), Some("mac required"));
    assert!(!devices.loading());
    assert!(devices.is_empty());
}

#[tokio::test]
async fn update_refetches_collection() {
    let (server, console) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/admin/api/devices/aa:bb:cc:dd:ee:ff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "device": { "target_version": "2.0.0" }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "aa:bb:cc:dd:ee:ff": { "target_version": "2.0.0" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let devices = console.devices();
    let updated = devices
        .update(
            "aa:bb:cc:dd:ee:ff",
            fields(json!({ "target_version": "2.0.0" })),
        )
        .await
        .unwrap();

    assert!(updated.success);
    assert_eq!(
        devices.get("aa:bb:cc:dd:ee:ff").unwrap().target_version(),
        Some("2.0.0")
    );
    assert!(!devices.loading());

    server.verify().await;
}

#[tokio::test]
async fn delete_failure_without_body_uses_fallback() {
    let (server, console) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/api/devices/aa:bb:cc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let devices = console.devices();
    let err = devices.delete("aa:bb:cc").await.unwrap_err();

    assert_eq!(err.message(), "Failed to delete device");
    assert_eq!(devices.error().as_deref(), Some("Failed to delete device"));
    assert!(!devices.loading());
}

#[tokio::test]
async fn delete_success_refetches() {
    let (server, console) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/api/devices/aa:bb:cc:dd:ee:ff"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let devices = console.devices();
    let confirmation = devices.delete("aa:bb:cc:dd:ee:ff").await.unwrap();

    assert!(confirmation.success);
    assert!(devices.is_empty());
    assert!(!devices.loading());

    server.verify().await;
}

// ── Firmware store ──────────────────────────────────────────────────

#[tokio::test]
async fn firmware_upload_refetches_listing() {
    let (server, console) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/firmware"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "fw_v1.2.0.bin",
            "checksum": "a1b2c3",
            "size": 4,
            "success": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/firmware"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "filename": "fw_v1.2.0.bin", "checksum": "a1b2c3", "size": 4 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let firmware = console.firmware();
    let uploaded = firmware
        .upload("fw_v1.2.0.bin", vec![0xde, 0xad, 0xbe, 0xef])
        .await
        .unwrap();

    assert!(uploaded.success);
    assert_eq!(firmware.len(), 1);
    let file = firmware.get("fw_v1.2.0.bin").unwrap();
    assert_eq!(file.checksum(), Some("a1b2c3"));
    assert_eq!(file.size(), Some(4));
    assert!(!firmware.loading());

    server.verify().await;
}

#[tokio::test]
async fn firmware_fetch_failure_uses_fallback() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/firmware"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let firmware = console.firmware();
    firmware.refresh().await;

    assert_eq!(
        firmware.error().as_deref(),
        Some("Failed to fetch firmware files")
    );
    assert!(!firmware.loading());
}

#[tokio::test]
async fn firmware_delete_failure_uses_fallback() {
    let (server, console) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/admin/api/firmware/fw_v1.2.0.bin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let firmware = console.firmware();
    let err = firmware.delete("fw_v1.2.0.bin").await.unwrap_err();

    assert_eq!(err.message(), "Failed to delete firmware");
    assert_eq!(
        firmware.error().as_deref(),
        Some("Failed to delete firmware")
    );
    assert!(!firmware.loading());
}

#[tokio::test]
async fn firmware_upload_structured_error_is_verbatim() {
    let (server, console) = setup().await;

    Mock::given(method("POST"))
        .and(path("/admin/api/firmware"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid filename" })))
        .mount(&server)
        .await;

    let firmware = console.firmware();
    let err = firmware.upload("../evil.bin", vec![1]).await.unwrap_err();

    assert_eq!(err.message(), "Invalid filename");
    assert_eq!(firmware.error().as_deref(), Some("Invalid filename"));
}

// ── Store independence ──────────────────────────────────────────────

#[tokio::test]
async fn stores_track_errors_independently() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/firmware"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    console.refresh_all().await;

    assert!(console.devices().error().is_none());
    assert_eq!(
        console.firmware().error().as_deref(),
        Some("Failed to fetch firmware files")
    );
    assert!(!console.devices().loading());
    assert!(!console.firmware().loading());
}

// ── Credential propagation ──────────────────────────────────────────

#[tokio::test]
async fn requests_carry_the_latest_credential() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .and(header("X-Admin-API-Key", "secret123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    console.credentials().set("secret123").unwrap();
    console.devices().refresh().await;

    assert!(console.devices().error().is_none());
    server.verify().await;
}

#[tokio::test]
async fn credential_change_applies_to_next_request() {
    let (server, console) = setup().await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .and(header("X-Admin-API-Key", "old-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/api/devices"))
        .and(header("X-Admin-API-Key", "new-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    console.credentials().set("old-key").unwrap();
    console.devices().refresh().await;

    console.credentials().set("new-key").unwrap();
    console.devices().refresh().await;

    server.verify().await;
}

#[tokio::test]
async fn persisted_credential_survives_console_rebuild() {
    let server = MockServer::start().await;
    let persister = Arc::new(MemoryPersister::new());

    let config = ConsoleConfig {
        url: server.uri().parse().unwrap(),
        tls: TlsVerification::SystemDefaults,
        timeout: Duration::from_secs(5),
    };

    {
        let console = Console::new(
            config.clone(),
            Arc::clone(&persister) as Arc<dyn otafleet_core::CredentialPersister>,
        )
        .unwrap();
        console.credentials().set("durable-key").unwrap();
    }

    // A fresh console over the same persister sees the stored value.
    let console = Console::new(
        config,
        Arc::clone(&persister) as Arc<dyn otafleet_core::CredentialPersister>,
    )
    .unwrap();
    assert_eq!(console.credentials().get(), "durable-key");
}
