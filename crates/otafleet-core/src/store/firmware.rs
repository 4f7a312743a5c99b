// ── Firmware store ──
//
// Mirrors `GET /admin/api/firmware`. Upload takes the place of create;
// otherwise the protocol is the same as the device store: write, then
// refetch the whole collection from the server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use otafleet_api::AdminClient;
use otafleet_api::types::{Confirmation, FirmwareUploaded};

use super::{ResourceState, normalize_error};
use crate::error::StoreError;
use crate::model::FirmwareFile;

const FETCH_FALLBACK: &str = "Failed to fetch firmware files";
const UPLOAD_FALLBACK: &str = "Failed to upload firmware";
const DELETE_FALLBACK: &str = "Failed to delete firmware";

/// Observable mirror of the server's firmware file collection.
pub struct FirmwareStore {
    client: Arc<AdminClient>,
    state: ResourceState<FirmwareFile>,
}

impl FirmwareStore {
    pub(crate) fn new(client: Arc<AdminClient>) -> Self {
        Self {
            client,
            state: ResourceState::new(),
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Fetch the firmware file list and replace the local mirror.
    ///
    /// Failures are absorbed into the store's error state; the previous
    /// collection stays visible.
    pub async fn refresh(&self) {
        self.state.begin();

        match self.client.list_firmware().await {
            Ok(records) => {
                let entries = records
                    .into_iter()
                    .map(|record| (record.filename.clone(), FirmwareFile::from(record)))
                    .collect();
                self.state.replace(entries);
                self.state.finish();
                debug!(files = self.state.len(), "firmware refresh complete");
            }
            Err(err) => {
                warn!(error = %err, "firmware refresh failed");
                self.state.fail(normalize_error(&err, FETCH_FALLBACK));
            }
        }
    }

    /// Upload a firmware image, then refetch the collection.
    pub async fn upload(
        &self,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<FirmwareUploaded, StoreError> {
        self.state.begin();

        match self.client.upload_firmware(filename, contents).await {
            Ok(uploaded) => {
                self.refresh().await;
                Ok(uploaded)
            }
            Err(err) => Err(self.reject(err, UPLOAD_FALLBACK)),
        }
    }

    /// Remove a firmware file, then refetch the collection.
    pub async fn delete(&self, filename: &str) -> Result<Confirmation, StoreError> {
        self.state.begin();

        match self.client.delete_firmware(filename).await {
            Ok(confirmation) => {
                self.refresh().await;
                Ok(confirmation)
            }
            Err(err) => Err(self.reject(err, DELETE_FALLBACK)),
        }
    }

    fn reject(&self, err: otafleet_api::Error, fallback: &str) -> StoreError {
        let message = normalize_error(&err, fallback);
        self.state.fail(message.clone());
        StoreError::new(message, err)
    }

    // ── State accessors ──────────────────────────────────────────────

    /// Current snapshot, in the server's listing order.
    pub fn snapshot(&self) -> Arc<Vec<Arc<FirmwareFile>>> {
        self.state.snapshot()
    }

    /// Look up a firmware file by filename.
    pub fn get(&self, filename: &str) -> Option<Arc<FirmwareFile>> {
        self.state.get(filename)
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    pub fn loading(&self) -> bool {
        self.state.loading()
    }

    pub fn error(&self) -> Option<String> {
        self.state.error()
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.state.last_synced()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<FirmwareFile>>>> {
        self.state.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.state.subscribe_loading()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<String>> {
        self.state.subscribe_error()
    }
}
