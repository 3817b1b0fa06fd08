use crate::config::MediaConfig;
use crate::error::{Error, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DEFAULT_BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Result of a successful image upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Publicly resolvable URL of the stored object
    pub url: String,
    /// Opaque id used to delete or replace the object later
    pub public_id: String,
}

/// Boundary to the external image-hosting service
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload binary content under the configured logical folder.
    ///
    /// Creates a durable remote object counted by the external service.
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<UploadedImage>;

    /// Remove a previously uploaded object.
    ///
    /// An already-deleted id is not an error; the remote reports it as
    /// "not found" and callers treat the delete as done either way.
    async fn delete(&self, public_id: &str) -> Result<()>;
}

/// Media store client for the hosted image service.
///
/// Talks to the service's signed REST API: every request carries the API key,
/// a timestamp, and a SHA-256 signature over the sorted parameters plus the
/// API secret. The image payload itself travels as a base64 data URI form
/// field, which is the encoding the service accepts for in-memory buffers.
pub struct CloudinaryStore {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    folder: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    /// Create a new client from media service configuration
    pub fn new(config: &MediaConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for media service")?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        info!(
            cloud_name = %config.cloud_name,
            folder = %config.folder,
            "media store client initialized"
        );

        Ok(Self {
            http,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
            base_url,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", self.base_url, self.cloud_name, action)
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[instrument(skip(self, bytes), fields(size_bytes = bytes.len(), mime_type = %mime_type))]
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<UploadedImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", &self.folder), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let form = [
            ("file", data_uri(bytes, mime_type)),
            ("folder", self.folder.clone()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
        ];

        debug!(size_bytes = bytes.len(), "uploading image to media service");

        let response = self
            .http
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Upload(anyhow!(e).context("upload request failed")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            metrics::counter!("media.upload_failures").increment(1);
            return Err(Error::Upload(anyhow!(
                "media service rejected upload: {status}: {body}"
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Upload(anyhow!(e).context("invalid upload response body")))?;

        metrics::counter!("media.uploads").increment(1);

        info!(public_id = %uploaded.public_id, "image uploaded");

        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    #[instrument(skip(self), fields(public_id = %public_id))]
    async fn delete(&self, public_id: &str) -> Result<()> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let form = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
        ];

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::RemoteService(anyhow!(e).context("destroy request failed")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteService(anyhow!(
                "media service rejected destroy: {status}: {body}"
            )));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| Error::RemoteService(anyhow!(e).context("invalid destroy response body")))?;

        if !destroy_result_ok(&destroyed.result) {
            return Err(Error::RemoteService(anyhow!(
                "media service failed to destroy object: {}",
                destroyed.result
            )));
        }

        if destroyed.result == "not found" {
            warn!("remote object already gone, treating delete as done");
        } else {
            debug!("remote object deleted");
        }

        metrics::counter!("media.deletes").increment(1);

        Ok(())
    }
}

/// Compute the request signature: hex SHA-256 of the sorted `key=value`
/// parameter string with the API secret appended.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let to_sign: Vec<String> = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(to_sign.join("&"));
    hasher.update(api_secret);
    hex::encode(hasher.finalize())
}

/// Encode an in-memory buffer as a `data:` URI for transport
fn data_uri(bytes: &[u8], mime_type: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime_type};base64,{encoded}")
}

/// Whether a destroy response result counts as success
fn destroy_result_ok(result: &str) -> bool {
    matches!(result, "ok" | "not found")
}

/// In-memory media store double shared by unit tests across the crate
#[cfg(test)]
pub(crate) mod testing {
    use super::{MediaStore, UploadedImage};
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records uploads and deletes; can be told to start failing either
    pub(crate) struct FakeMediaStore {
        uploads: AtomicU64,
        deleted: Mutex<Vec<String>>,
        fail_upload: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl FakeMediaStore {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                uploads: AtomicU64::new(0),
                deleted: Mutex::new(Vec::new()),
                fail_upload: AtomicBool::new(false),
                fail_delete: AtomicBool::new(false),
            })
        }

        pub(crate) fn upload_count(&self) -> u64 {
            self.uploads.load(Ordering::SeqCst)
        }

        pub(crate) fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }

        pub(crate) fn fail_uploads(&self) {
            self.fail_upload.store(true, Ordering::SeqCst);
        }

        pub(crate) fn fail_deletes(&self) {
            self.fail_delete.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MediaStore for FakeMediaStore {
        async fn upload(&self, _bytes: &[u8], mime_type: &str) -> Result<UploadedImage> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(Error::Upload(anyhow::anyhow!("upload refused")));
            }
            let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
            let ext = mime_type.rsplit('/').next().unwrap_or("bin");
            Ok(UploadedImage {
                url: format!("https://images.example/places/upload-{n}.{ext}"),
                public_id: format!("places/upload-{n}"),
            })
        }

        async fn delete(&self, public_id: &str) -> Result<()> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(Error::RemoteService(anyhow::anyhow!("destroy refused")));
            }
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }
}
