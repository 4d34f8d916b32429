// Content-addressed storage for token images and metadata documents.

use crate::config::StorageConfig;
use crate::error::{ErrorCode, PlatformError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ContentBlob {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredContent {
    pub cid: String,
    pub url: String,
}

#[async_trait]
pub trait ContentStorage: Send + Sync {
    async fn store(&self, blob: ContentBlob) -> Result<StoredContent>;
}

fn gateway_url(gateway: &str, cid: &str) -> String {
    format!("{}/{}", gateway.trim_end_matches('/'), cid)
}

/// Metaplex-style off-chain metadata document for a freshly minted token.
pub fn build_token_metadata_json(
    name: &str,
    symbol: &str,
    description: &str,
    image_url: &str,
    image_content_type: &str,
    creator: &str,
) -> JsonValue {
    let file_type = if image_content_type.is_empty() {
        "image/png"
    } else {
        image_content_type
    };

    json!({
        "name": name,
        "symbol": symbol,
        "description": description,
        "image": image_url,
        "attributes": [],
        "external_url": "",
        "properties": {
            "files": [{ "uri": image_url, "type": file_type }],
            "category": "image",
            "creators": [{ "address": creator, "share": 100 }],
        },
    })
}

/// Keeps blobs in memory, keyed by the sha256 of their bytes.
pub struct MemoryContentStorage {
    gateway_url: String,
    blobs: RwLock<HashMap<String, ContentBlob>>,
}

impl MemoryContentStorage {
    pub fn new(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into(),
            blobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, cid: &str) -> Option<ContentBlob> {
        self.blobs.read().await.get(cid).cloned()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

impl Default for MemoryContentStorage {
    fn default() -> Self {
        Self::new(StorageConfig::default().gateway_url)
    }
}

#[async_trait]
impl ContentStorage for MemoryContentStorage {
    async fn store(&self, blob: ContentBlob) -> Result<StoredContent> {
        if blob.bytes.is_empty() {
            return Err(PlatformError::integration(
                ErrorCode::StorageUploadFailed,
                format!("refusing to store empty file {}", blob.name),
                false,
            ));
        }
        let cid = format!("{:x}", Sha256::digest(&blob.bytes));
        self.blobs.write().await.insert(cid.clone(), blob);
        Ok(StoredContent {
            url: gateway_url(&self.gateway_url, &cid),
            cid,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LighthouseUploadResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Uploads to the Lighthouse IPFS pinning service.
pub struct LighthouseStorage {
    client: reqwest::Client,
    api_key: String,
    upload_url: String,
    gateway_url: String,
}

impl LighthouseStorage {
    pub fn new(config: &StorageConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            upload_url: config.upload_url.clone(),
            gateway_url: config.gateway_url.clone(),
        }
    }

    fn upload_error(message: String, retryable: bool) -> PlatformError {
        PlatformError::integration(ErrorCode::StorageUploadFailed, message, retryable)
    }
}

#[async_trait]
impl ContentStorage for LighthouseStorage {
    async fn store(&self, blob: ContentBlob) -> Result<StoredContent> {
        let part = reqwest::multipart::Part::bytes(blob.bytes)
            .file_name(blob.name.clone())
            .mime_str(&blob.content_type)
            .map_err(|e| Self::upload_error(format!("bad content type: {e}"), false))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Lighthouse upload of {} failed: {}", blob.name, e);
                Self::upload_error(format!("upload request failed: {e}"), true)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::upload_error(
                format!("upload of {} rejected with status {}", blob.name, status),
                status.is_server_error(),
            ));
        }

        let body: LighthouseUploadResponse = response
            .json()
            .await
            .map_err(|e| Self::upload_error(format!("unreadable upload response: {e}"), false))?;

        info!("Uploaded {} to IPFS as {}", blob.name, body.hash);
        Ok(StoredContent {
            url: gateway_url(&self.gateway_url, &body.hash),
            cid: body.hash,
        })
    }
}

/// Picks Lighthouse when an API key is configured, memory otherwise.
pub fn storage_from_config(config: &StorageConfig) -> Box<dyn ContentStorage> {
    match &config.lighthouse_api_key {
        Some(key) if !key.is_empty() => Box::new(LighthouseStorage::new(config, key.clone())),
        _ => Box::new(MemoryContentStorage::new(config.gateway_url.clone())),
    }
}
