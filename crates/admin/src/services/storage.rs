//! Object storage client (Firebase Storage REST API).
//!
//! Product and promotion images are uploaded under
//! `images/{upload-millis}_{original filename}` and referenced from records
//! by their public download URL.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::FirebaseConfig;

/// Prefix every uploaded object is stored under.
pub const IMAGE_PREFIX: &str = "images/";

/// Errors that can occur when calling object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The URL is not a download URL of this bucket.
    #[error("Not a storage URL: {0}")]
    InvalidUrl(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub download_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    name: String,
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Object name for an upload: `images/{millis}_{file name}`.
///
/// Any directory part of the client-supplied name is dropped.
#[must_use]
pub fn object_name(file_name: &str, uploaded_at_millis: i64) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("upload");
    format!("{IMAGE_PREFIX}{uploaded_at_millis}_{base}")
}

/// Firebase Storage client.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<StorageInner>,
}

struct StorageInner {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: SecretString,
}

impl StorageClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, StorageError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            inner: Arc::new(StorageInner {
                client,
                base_url: config.storage_url.clone(),
                bucket: config.storage_bucket.clone(),
                token: config.service_token.clone(),
            }),
        })
    }

    fn bucket_url(&self) -> String {
        format!("{}/v0/b/{}/o", self.inner.base_url, self.inner.bucket)
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}", self.bucket_url(), urlencoding::encode(name))
    }

    /// Public download URL of an object.
    #[must_use]
    pub fn download_url(&self, name: &str, token: Option<&str>) -> String {
        let mut url = format!("{}?alt=media", self.object_url(name));
        if let Some(token) = token {
            url.push_str("&token=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }

    /// Object name referenced by a download URL of this bucket.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUrl` for URLs of other hosts or buckets.
    pub fn object_name_from_url(&self, download_url: &str) -> Result<String, StorageError> {
        let invalid = || StorageError::InvalidUrl(download_url.to_string());

        let url = url::Url::parse(download_url).map_err(|_| invalid())?;
        let prefix = format!("/v0/b/{}/o/", self.inner.bucket);
        let encoded = url.path().strip_prefix(&prefix).ok_or_else(invalid)?;
        if encoded.is_empty() {
            return Err(invalid());
        }

        urlencoding::decode(encoded)
            .map(std::borrow::Cow::into_owned)
            .map_err(|_| invalid())
    }

    /// Upload one image and return its stored name and download URL.
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        uploaded_at_millis: i64,
    ) -> Result<StoredObject, StorageError> {
        let name = object_name(file_name, uploaded_at_millis);

        let mut url = url::Url::parse(&self.bucket_url())
            .map_err(|e| StorageError::Parse(format!("invalid storage URL: {e}")))?;
        url.query_pairs_mut().append_pair("name", &name);

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(self.inner.token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| StorageError::Parse(format!("Failed to parse response: {e}")))?;

        // Several tokens may be returned comma-separated; any of them works.
        let token = body
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next());
        let download_url = self.download_url(&body.name, token);

        tracing::info!(object = %body.name, "Image uploaded");
        Ok(StoredObject {
            name: body.name,
            download_url,
        })
    }

    /// Delete the object behind a download URL. Already-deleted objects are
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is not of this bucket or the call fails.
    pub async fn delete_by_url(&self, download_url: &str) -> Result<(), StorageError> {
        let name = self.object_name_from_url(download_url)?;

        let response = self
            .inner
            .client
            .delete(self.object_url(&name))
            .bearer_auth(self.inner.token.expose_secret())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(object = %name, "Image already deleted");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(Self::parse_error(response).await);
        }

        tracing::info!(object = %name, "Image deleted");
        Ok(())
    }

    /// Delete every image in `urls`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first deletion error.
    pub async fn delete_all(&self, urls: &[String]) -> Result<(), StorageError> {
        for url in urls {
            self.delete_by_url(url).await?;
        }
        Ok(())
    }

    async fn parse_error(response: reqwest::Response) -> StorageError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        StorageError::Api { status, message }
    }
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("base_url", &self.inner.base_url)
            .field("bucket", &self.inner.bucket)
            .finish_non_exhaustive()
    }
}
