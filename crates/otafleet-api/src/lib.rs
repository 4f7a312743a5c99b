// otafleet-api: async HTTP client for the OTA fleet admin API.

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::{ADMIN_API_KEY_HEADER, AdminClient};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
