// otafleet-core: observable state layer between otafleet-api and consumers.
//
// Holds the client-side mirror of the server's collections (devices,
// firmware files) plus the shared credential, and keeps them consistent
// through a refetch-after-write protocol.

pub mod config;
pub mod console;
pub mod credential;
pub mod error;
pub mod model;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConsoleConfig, TlsVerification};
pub use console::Console;
pub use credential::{CredentialPersister, CredentialStore, MemoryPersister, PersistError};
pub use error::{CoreError, StoreError};
pub use model::{Device, FirmwareFile};
pub use store::{DeviceStore, FirmwareStore};

// Re-export the wire-level payload types: consumers build requests and
// read responses without depending on otafleet-api directly.
pub use otafleet_api::types::{
    Confirmation, DeviceCreateRequest, DeviceCreated, DeviceUpdated, FieldMap, FirmwareUploaded,
};
