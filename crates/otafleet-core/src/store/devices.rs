// ── Device store ──
//
// Mirrors `GET /admin/api/devices`, which keys the collection by MAC
// address. Writes go through the API and trigger a full refetch; the
// local copy is only ever rebuilt from the server's answer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use otafleet_api::AdminClient;
use otafleet_api::types::{Confirmation, DeviceCreateRequest, DeviceCreated, DeviceUpdated, FieldMap};

use super::{ResourceState, normalize_error};
use crate::error::StoreError;
use crate::model::Device;

const FETCH_FALLBACK: &str = "Failed to fetch devices";
const ADD_FALLBACK: &str = "Failed to add device";
const UPDATE_FALLBACK: &str = "Failed to update device";
const DELETE_FALLBACK: &str = "Failed to delete device";

/// Observable mirror of the server's device collection.
pub struct DeviceStore {
    client: Arc<AdminClient>,
    state: ResourceState<Device>,
}

impl DeviceStore {
    pub(crate) fn new(client: Arc<AdminClient>) -> Self {
        Self {
            client,
            state: ResourceState::new(),
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the full device collection and replace the local mirror.
    ///
    /// Failures are absorbed into the store's error state — there is
    /// nothing further for a caller to do with a read failure. The
    /// previous collection stays visible either way.
    pub async fn refresh(&self) {
        self.state.begin();

        match self.client.list_devices().await {
            Ok(by_mac) => {
                // Expand the MAC-keyed mapping into records. BTreeMap
                // iteration gives a deterministic, MAC-sorted snapshot
                // and cannot produce duplicate keys.
                let entries = by_mac
                    .into_iter()
                    .map(|(mac, fields)| (mac.clone(), Device { mac, fields }))
                    .collect();
                self.state.replace(entries);
                self.state.finish();
                debug!(devices = self.state.len(), "device refresh complete");
            }
            Err(err) => {
                warn!(error = %err, "device refresh failed");
                self.state.fail(normalize_error(&err, FETCH_FALLBACK));
            }
        }
    }

    /// Register a new device, then refetch the collection.
    pub async fn create(&self, request: DeviceCreateRequest) -> Result<DeviceCreated, StoreError> {
        self.state.begin();

        match self.client.create_device(&request).await {
            Ok(created) => {
                self.refresh().await;
                Ok(created)
            }
            Err(err) => Err(self.reject(err, ADD_FALLBACK)),
        }
    }

    /// Replace an existing device's fields, then refetch the collection.
    ///
    /// Existence of `mac` is the server's call — nothing is validated
    /// locally.
    pub async fn update(&self, mac: &str, fields: FieldMap) -> Result<DeviceUpdated, StoreError> {
        self.state.begin();

        match self.client.update_device(mac, &fields).await {
            Ok(updated) => {
                self.refresh().await;
                Ok(updated)
            }
            Err(err) => Err(self.reject(err, UPDATE_FALLBACK)),
        }
    }

    /// Remove a device record, then refetch the collection.
    pub async fn delete(&self, mac: &str) -> Result<Confirmation, StoreError> {
        self.state.begin();

        match self.client.delete_device(mac).await {
            Ok(confirmation) => {
                self.refresh().await;
                Ok(confirmation)
            }
            Err(err) => Err(self.reject(err, DELETE_FALLBACK)),
        }
    }

    /// Record the failure in observable state and build the caller's copy.
    fn reject(&self, err: otafleet_api::Error, fallback: &str) -> StoreError {
        let message = normalize_error(&err, fallback);
        self.state.fail(message.clone());
        StoreError::new(message, err)
    }

    // ── State accessors ──────────────────────────────────────────────

    /// Current snapshot, sorted by MAC.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Device>>> {
        self.state.snapshot()
    }

    /// Look up a device by MAC address.
    pub fn get(&self, mac: &str) -> Option<Arc<Device>> {
        self.state.get(mac)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    /// `true` while an operation is in flight.
    pub fn loading(&self) -> bool {
        self.state.loading()
    }

    /// The last operation's failure message, if it failed.
    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    /// When the mirror last matched the server.
    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.state.last_synced()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<Device>>>> {
        self.state.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.state.subscribe_loading()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.state.subscribe_error()
    }
}
