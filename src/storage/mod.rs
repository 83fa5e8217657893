//! Where uploaded room images live. Object names are relative paths such
//! as `room_images/<uuid>.jpg`; each backend maps them to its own layout.

mod gcs;
mod local;

use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StorageConfig, StorageKind};

pub use self::gcs::GcsStorage;
pub use self::local::LocalStorage;

/// Prefix under which uploaded room images are stored.
pub const ROOM_IMAGE_DIR: &str = "room_images";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Http(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `content` under `name`, replacing any existing object.
    /// Returns the name the object was stored under.
    async fn save(&self, name: &str, content: &[u8]) -> StorageResult<String>;

    async fn open(&self, name: &str) -> StorageResult<Vec<u8>>;

    async fn delete(&self, name: &str) -> StorageResult<()>;

    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Public URL of the object.
    fn url(&self, name: &str) -> String;

    fn kind(&self) -> &'static str;
}

pub fn build_storage(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    let storage: Arc<dyn StorageBackend> = match config.backend {
        StorageKind::Local => {
            let root = config
                .path
                .clone()
                .ok_or_else(|| StorageError::Config("storage.path is not set".into()))?;
            std::fs::create_dir_all(&root)?;
            Arc::new(LocalStorage::new(root))
        }
        StorageKind::Gcs => Arc::new(GcsStorage::new(config)?),
    };
    tracing::info!("Storage backend: {}", storage.kind());
    Ok(storage)
}

/// Reject names that could escape the storage root.
pub fn validate_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.contains('\\') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    let all_normal = Path::new(name)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Image types accepted for rooms. SVG is refused since browsers run
/// scripts embedded in it.
pub fn is_room_image(mime: &mime_guess::Mime) -> bool {
    mime.type_() == mime_guess::mime::IMAGE && mime.subtype() != mime_guess::mime::SVG
}

/// Fresh object name for an uploaded room image. Only image types are
/// accepted, judged by the file extension.
pub fn room_image_name(original_filename: &str) -> StorageResult<String> {
    let ext = Path::new(original_filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| StorageError::InvalidName(original_filename.to_string()))?;

    let is_image = mime_guess::from_ext(&ext).first().is_some_and(|mime| is_room_image(&mime));
    if !is_image {
        return Err(StorageError::InvalidName(original_filename.to_string()));
    }

    Ok(format!(
        "{}/{}.{}",
        ROOM_IMAGE_DIR,
        uuid::Uuid::now_v7(),
        ext
    ))
}

pub fn content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
