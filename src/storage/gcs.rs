use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use url::Url;

use super::{content_type, validate_name, StorageBackend, StorageError, StorageResult};
use crate::config::StorageConfig;

const API_BASE: &str = "https://storage.googleapis.com";
const OBJECT_PREFIX: &str = "media";

/// Google Cloud Storage bucket accessed through the JSON API. The bucket
/// uses uniform access, so objects are public through the bucket policy
/// rather than per-object ACLs.
#[derive(Debug, Clone)]
pub struct GcsStorage {
    client: Client,
    bucket: String,
    access_token: Option<String>,
    public_base_url: String,
}

impl GcsStorage {
    pub fn new(config: &StorageConfig) -> StorageResult<Self> {
        let bucket = config
            .bucket
            .clone()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| StorageError::Config("storage.bucket is not set".into()))?;

        let public_base_url = config
            .public_base_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}/{}", API_BASE, bucket, OBJECT_PREFIX));

        Ok(Self {
            client: Client::new(),
            bucket,
            access_token: config.access_token.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_name(name: &str) -> StorageResult<String> {
        validate_name(name)?;
        Ok(format!("{}/{}", OBJECT_PREFIX, name))
    }

    /// `.../storage/v1/b/<bucket>/o/<object>` with the object name as a
    /// single encoded segment.
    fn object_url(&self, name: &str) -> StorageResult<Url> {
        let object = Self::object_name(name)?;
        let mut url = Url::parse(API_BASE).map_err(|e| StorageError::Config(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Config("API base cannot be a base URL".into()))?
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", object.as_str()]);
        Ok(url)
    }

    fn upload_url(&self, name: &str) -> StorageResult<Url> {
        let object = Self::object_name(name)?;
        let mut url = Url::parse(API_BASE).map_err(|e| StorageError::Config(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| StorageError::Config("API base cannot be a base URL".into()))?
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &object);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StorageBackend for GcsStorage {
    async fn save(&self, name: &str, content: &[u8]) -> StorageResult<String> {
        let url = self.upload_url(name)?;
        self.authorize(self.client.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type(name))
            .body(content.to_vec())
            .send()
            .await?
            .error_for_status()?;
        tracing::debug!(bucket = %self.bucket, name, "Uploaded object");
        Ok(name.to_string())
    }

    async fn open(&self, name: &str) -> StorageResult<Vec<u8>> {
        let mut url = self.object_url(name)?;
        url.query_pairs_mut().append_pair("alt", "media");
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let bytes = response.error_for_status()?.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let url = self.object_url(name)?;
        let response = self.authorize(self.client.delete(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(name.to_string()));
        }
        response.error_for_status()?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let url = self.object_url(name)?;
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        response.error_for_status()?;
        Ok(true)
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.public_base_url, name)
    }

    fn kind(&self) -> &'static str {
        "gcs"
    }
}
