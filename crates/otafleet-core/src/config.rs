// ── Runtime connection configuration ──
//
// These types describe *how* to reach the admin API. They carry
// connection tuning but never touch disk — the CLI constructs a
// `ConsoleConfig` and hands it in.

use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

impl PartialEq for TlsVerification {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SystemDefaults, Self::SystemDefaults)
            | (Self::DangerAcceptInvalid, Self::DangerAcceptInvalid) => true,
            (Self::CustomCa(a), Self::CustomCa(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TlsVerification {}

/// Configuration for connecting to a single admin server.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Server base URL (e.g., `http://192.168.1.50:8000`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: std::time::Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000"
                .parse()
                .expect("default URL is valid"),
            tls: TlsVerification::default(),
            timeout: std::time::Duration::from_secs(30),
        }
    }
}
