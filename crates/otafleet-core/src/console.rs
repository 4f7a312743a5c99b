// ── Console aggregate ──
//
// Wires one credential store and one HTTP client to the two resource
// stores. Constructed once at application start and passed by reference
// to consumers — no module-level state anywhere in the crate.

use std::sync::Arc;

use otafleet_api::{AdminClient, TlsMode, TransportConfig};

use crate::config::{ConsoleConfig, TlsVerification};
use crate::credential::{CredentialPersister, CredentialStore};
use crate::error::CoreError;
use crate::store::{DeviceStore, FirmwareStore};

/// The admin console's client-side state: credential plus the two
/// collection mirrors, sharing one HTTP client.
pub struct Console {
    config: ConsoleConfig,
    credentials: Arc<CredentialStore>,
    devices: DeviceStore,
    firmware: FirmwareStore,
}

impl Console {
    /// Build a console whose credential store persists through `persister`.
    ///
    /// The persisted credential (if any) is loaded here; no network
    /// traffic happens until a store operation is invoked.
    pub fn new(
        config: ConsoleConfig,
        persister: Arc<dyn CredentialPersister>,
    ) -> Result<Self, CoreError> {
        let credentials = Arc::new(CredentialStore::new(persister));
        Self::with_credentials(config, credentials)
    }

    /// Build a console around an existing credential store.
    pub fn with_credentials(
        config: ConsoleConfig,
        credentials: Arc<CredentialStore>,
    ) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = Arc::new(AdminClient::new(
            config.url.as_str(),
            credentials.subscribe(),
            &transport,
        )?);

        Ok(Self {
            config,
            credentials,
            devices: DeviceStore::new(Arc::clone(&client)),
            firmware: FirmwareStore::new(client),
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// The shared credential store. Stores read it per request; only
    /// consumers (forms, `config set-key`) write it.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn devices(&self) -> &DeviceStore {
        &self.devices
    }

    pub fn firmware(&self) -> &FirmwareStore {
        &self.firmware
    }

    /// Refresh both collections concurrently.
    pub async fn refresh_all(&self) {
        tokio::join!(self.devices.refresh(), self.firmware.refresh());
    }
}

/// Build a [`TransportConfig`] from the console configuration.
fn build_transport(config: &ConsoleConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}
