//! Profile picture hosting.
//!
//! [`ImageService`] validates payloads and delegates to an [`ImageStore`];
//! the production store is Cloudinary's REST API.

use std::sync::Arc;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_FOLDER: &str = "genius-prep/profiles";
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

/// Remote image host.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// `image` is a data URI or a remote URL the host fetches itself.
    async fn upload(&self, image: &str, folder: &str) -> anyhow::Result<UploadedImage>;

    async fn destroy(&self, public_id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct ImageService {
    store: Option<Arc<dyn ImageStore>>,
    folder: String,
    max_bytes: usize,
}

impl std::fmt::Debug for ImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageService")
            .field("configured", &self.store.is_some())
            .field("folder", &self.folder)
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

impl ImageService {
    pub fn new(store: Option<Arc<dyn ImageStore>>, folder: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            store,
            folder: folder.into(),
            max_bytes,
        }
    }

    pub fn disabled() -> Self {
        Self::new(None, DEFAULT_FOLDER, DEFAULT_MAX_BYTES)
    }

    fn store(&self) -> ServiceResult<&Arc<dyn ImageStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| ServiceError::Unavailable("Image uploads are not configured".into()))
    }

    #[instrument(skip_all)]
    pub async fn upload(&self, image: Option<String>) -> ServiceResult<UploadedImage> {
        let image = image.unwrap_or_default();
        validate_image_payload(&image, self.max_bytes)?;
        let store = self.store()?;
        let uploaded = store.upload(image.trim(), &self.folder).await?;
        tracing::info!(public_id = %uploaded.public_id, "image uploaded");
        Ok(uploaded)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, public_id: Option<String>) -> ServiceResult<()> {
        let public_id = public_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::invalid("No public ID provided"))?;
        self.store()?.destroy(&public_id).await?;
        Ok(())
    }
}

/// Accepts base64 `data:image/*` URIs within `max_bytes`, or http(s) URLs.
pub fn validate_image_payload(image: &str, max_bytes: usize) -> ServiceResult<()> {
    let image = image.trim();
    if image.is_empty() {
        return Err(ServiceError::invalid("No image provided"));
    }
    if image.starts_with("https://") || image.starts_with("http://") {
        return Ok(());
    }
    let Some(rest) = image.strip_prefix("data:") else {
        return Err(ServiceError::invalid(
            "Image must be a data URI or an http(s) URL",
        ));
    };
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| ServiceError::invalid("Malformed image data URI"))?;
    let Some(mime) = meta.strip_suffix(";base64") else {
        return Err(ServiceError::invalid("Image data must be base64 encoded"));
    };
    if !mime.starts_with("image/") {
        return Err(ServiceError::invalid("Only image uploads are supported"));
    }
    // Decoded size is about 3/4 of the encoded length; reject early before decoding.
    if payload.len() / 4 * 3 > max_bytes + 3 {
        return Err(too_large(max_bytes));
    }
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| ServiceError::invalid("Image data is not valid base64"))?;
    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(())
}

fn too_large(max_bytes: usize) -> ServiceError {
    ServiceError::invalid(format!("Image exceeds the {max_bytes} byte limit"))
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_base: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("upload_preset", &self.upload_preset)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("building http client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            path
        )
    }
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    async fn upload(&self, image: &str, folder: &str) -> anyhow::Result<UploadedImage> {
        let response = self
            .client
            .post(self.endpoint("image/upload"))
            .form(&[
                ("file", image),
                ("upload_preset", self.config.upload_preset.as_str()),
                ("folder", folder),
            ])
            .send()
            .await
            .context("sending upload request")?
            .error_for_status()
            .context("upload rejected")?;
        let body: UploadResponse = response.json().await.context("decoding upload response")?;
        Ok(UploadedImage {
            url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> anyhow::Result<()> {
        let (Some(key), Some(secret)) = (&self.config.api_key, &self.config.api_secret) else {
            return Err(anyhow!("deleting images needs CLOUDINARY_API_KEY and CLOUDINARY_API_SECRET"));
        };
        self.client
            .delete(self.endpoint("resources/image/upload"))
            .basic_auth(key, Some(secret))
            .query(&[("public_ids[]", public_id)])
            .send()
            .await
            .context("sending delete request")?
            .error_for_status()
            .context("delete rejected")?;
        Ok(())
    }
}
