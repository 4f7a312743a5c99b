// Hand-crafted async HTTP client for the OTA fleet admin API.
//
// Base path: /admin/api/
// Auth: X-Admin-API-Key header, read fresh from a watch channel on
// every request so a credential change applies to the next call.

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::Error;
use crate::transport::TransportConfig;
use crate::types::{
    Confirmation, DeviceCreateRequest, DeviceCreated, DeviceUpdated, FieldMap, FirmwareRecord,
    FirmwareUploaded,
};

/// Header carrying the admin API key.
pub const ADMIN_API_KEY_HEADER: &str = "X-Admin-API-Key";

// ── Error response shape from the admin API ──────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the admin API.
///
/// Communicates via JSON REST endpoints under `/admin/api/`. The API
/// key is never baked into default headers: it is read from the watch
/// receiver per request, so whoever owns the sender controls the
/// credential of every in-flight and future call.
pub struct AdminClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: watch::Receiver<String>,
}

impl AdminClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a server base URL, a credential subscription, and
    /// transport config.
    pub fn new(
        base_url: &str,
        api_key: watch::Receiver<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages transport).
    pub fn from_reqwest(
        base_url: &str,
        http: reqwest::Client,
        api_key: watch::Receiver<String>,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Build the base URL ending in `/admin/api/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;

        // Strip trailing slash for uniform handling
        let path = url.path().trim_end_matches('/').to_owned();

        if path.ends_with("/admin/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/admin/api/"));
        }

        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"devices"`) onto the base URL.
    fn url(&self, path: &str) -> Url {
        // base_url always ends with `/admin/api/`, so joining works.
        self.base_url
            .join(path)
            .expect("path should be valid relative URL")
    }

    /// Current API key, cloned out of the watch channel.
    ///
    /// The borrow guard must not be held across an await point.
    fn current_key(&self) -> String {
        self.api_key.borrow().clone()
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .header(ADMIN_API_KEY_HEADER, self.current_key())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header(ADMIN_API_KEY_HEADER, self.current_key())
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("POST {url} (multipart)");

        let resp = self
            .http
            .post(url)
            .header(ADMIN_API_KEY_HEADER, self.current_key())
            .multipart(form)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path);
        debug!("PUT {url}");

        let resp = self
            .http
            .put(url)
            .header(ADMIN_API_KEY_HEADER, self.current_key())
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path);
        debug!("DELETE {url}");

        let resp = self
            .http
            .delete(url)
            .header(ADMIN_API_KEY_HEADER, self.current_key())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = &body[..body.len().min(200)];
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    /// Map a non-success response to [`Error::Api`].
    ///
    /// The `message` is populated only when the body is a JSON object
    /// with an `error` string field; anything else leaves it `None` so
    /// the store layer can substitute its fixed fallback text.
    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.error);

        Error::Api {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Devices ──────────────────────────────────────────────────────

    /// List all registered devices, keyed by MAC address.
    pub async fn list_devices(&self) -> Result<BTreeMap<String, FieldMap>, Error> {
        self.get("devices").await
    }

    /// Fetch a single device record by MAC address.
    pub async fn get_device(&self, mac: &str) -> Result<FieldMap, Error> {
        self.get(&format!("devices/{mac}")).await
    }

    /// Register a new device.
    pub async fn create_device(&self, body: &DeviceCreateRequest) -> Result<DeviceCreated, Error> {
        self.post("devices", body).await
    }

    /// Replace the fields of an existing device.
    pub async fn update_device(&self, mac: &str, fields: &FieldMap) -> Result<DeviceUpdated, Error> {
        self.put(&format!("devices/{mac}"), fields).await
    }

    /// Remove a device record.
    pub async fn delete_device(&self, mac: &str) -> Result<Confirmation, Error> {
        self.delete(&format!("devices/{mac}")).await
    }

    // ── Firmware ─────────────────────────────────────────────────────

    /// List all firmware files on the server.
    pub async fn list_firmware(&self) -> Result<Vec<FirmwareRecord>, Error> {
        self.get("firmware").await
    }

    /// Fetch metadata for a single firmware file.
    pub async fn firmware_info(&self, filename: &str) -> Result<FirmwareRecord, Error> {
        self.get(&format!("firmware/{filename}/info")).await
    }

    /// Upload a firmware image as multipart form field `file`.
    pub async fn upload_firmware(
        &self,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<FirmwareUploaded, Error> {
        let part = reqwest::multipart::Part::bytes(contents)
            .file_name(filename.to_owned())
            .mime_str("application/octet-stream")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart("firmware", form).await
    }

    /// Remove a firmware file from the server.
    pub async fn delete_firmware(&self, filename: &str) -> Result<Confirmation, Error> {
        self.delete(&format!("firmware/{filename}")).await
    }
}
