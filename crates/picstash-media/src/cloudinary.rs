//! Cloudinary upload API client
//!
//! Implements the two calls the image pipelines need from the Cloudinary
//! REST API:
//! - `POST /{cloud}/image/upload` (multipart, signed)
//! - `POST /{cloud}/image/destroy` (form, signed)
//!
//! Requests are authenticated with the documented signature scheme: the
//! signed parameters are sorted by name, serialized as `k=v` pairs joined by
//! `&`, suffixed with the API secret and hashed with SHA-1.

use crate::{DeleteOutcome, MediaError, MediaStore, Result, StoredMedia};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default Cloudinary API base URL
pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Parameters that never take part in the request signature
const UNSIGNED_PARAMS: &[&str] = &["file", "api_key", "resource_type", "cloud_name"];

/// Configuration for the Cloudinary client
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    /// Cloud name (account identifier)
    pub cloud_name: String,
    /// API key
    pub api_key: String,
    /// API secret used for signing
    pub api_secret: String,
    /// API base URL
    pub api_base: String,
    /// Optional folder uploaded assets are placed in
    pub folder: Option<String>,
    /// Request timeout
    pub timeout: Duration,
}

impl CloudinaryConfig {
    /// Create a new config from discrete credentials
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            folder: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Parse a `cloudinary://<api_key>:<api_secret>@<cloud_name>` URL
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = url::Url::parse(raw)
            .map_err(|e| MediaError::Configuration(format!("invalid Cloudinary URL: {}", e)))?;

        if url.scheme() != "cloudinary" {
            return Err(MediaError::Configuration(format!(
                "unexpected scheme '{}', expected 'cloudinary'",
                url.scheme()
            )));
        }

        let cloud_name = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| MediaError::Configuration("missing cloud name".to_string()))?;
        let api_key = url.username();
        let api_secret = url
            .password()
            .ok_or_else(|| MediaError::Configuration("missing API secret".to_string()))?;

        if api_key.is_empty() {
            return Err(MediaError::Configuration("missing API key".to_string()));
        }

        Ok(Self::new(cloud_name, api_key, api_secret))
    }

    /// Override the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Place uploads in a folder
    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Compute the request signature for a set of parameters
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut signed: Vec<_> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && !UNSIGNED_PARAMS.contains(k))
        .collect();
    signed.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = signed
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
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

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary-backed media store
#[derive(Clone)]
pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    /// Create a new Cloudinary client
    pub fn new(config: CloudinaryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MediaError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Access the configuration
    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Timeouts are reported with the configured limit
    fn transport_error(&self, err: reqwest::Error) -> MediaError {
        if err.is_timeout() {
            MediaError::Timeout {
                seconds: self.config.timeout.as_secs(),
            }
        } else {
            MediaError::from(err)
        }
    }

    async fn remote_error(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        format!("({}) {}", status, message)
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn upload(&self, path: &Path) -> Result<StoredMedia> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let mut params: Vec<(&str, &str)> = vec![("timestamp", timestamp.as_str())];
        if let Some(folder) = self.config.folder.as_deref() {
            params.push(("folder", folder));
        }
        let signature = sign_params(&params, &self.config.api_secret);

        let mut form = Form::new()
            .part("file", Part::bytes(data).file_name(file_name))
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (k, v) in &params {
            form = form.text(k.to_string(), v.to_string());
        }

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(MediaError::UploadFailed(Self::remote_error(response).await));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Deserialization(e.to_string()))?;

        debug!(public_id = %uploaded.public_id, "Uploaded to Cloudinary");

        Ok(StoredMedia {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, public_id: &str) -> Result<DeleteOutcome> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let params = [("public_id", public_id), ("timestamp", timestamp.as_str())];
        let signature = sign_params(&params, &self.config.api_secret);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&[
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.config.api_key.as_str()),
                ("signature", signature.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(MediaError::DeleteFailed(Self::remote_error(response).await));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Deserialization(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" => Ok(DeleteOutcome::Deleted),
            "not found" => Ok(DeleteOutcome::NotFound),
            other => Err(MediaError::DeleteFailed(format!(
                "unexpected destroy result: {}",
                other
            ))),
        }
    }
}
