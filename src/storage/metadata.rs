use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};

/// One uploaded image, as persisted in the metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub image_path: String,
}

impl ImageRecord {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("metadata io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata file {path} is not a valid record list: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize metadata: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Ordered, append-only index of uploaded images.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Add a record after every existing one.
    async fn append(&self, record: ImageRecord) -> Result<(), StoreError>;

    /// All records in insertion order. Empty when nothing was stored yet.
    async fn list_all(&self) -> Result<Vec<ImageRecord>, StoreError>;
}

/// A [`MetadataStore`] backed by one JSON array file.
///
/// Appends hold an async mutex across the read-modify-write, and the new
/// array is written to a sibling temp file that is then renamed over the
/// original. Within one process no append is lost, and a crash mid-write
/// leaves either the previous or the new complete file. Separate processes
/// sharing the file are not coordinated.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|value| value.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    async fn read_records(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(self.io_error(&self.path, err)),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: self.path.display().to_string(),
            source,
        })
    }

    async fn write_records(&self, records: &[ImageRecord]) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(records).map_err(StoreError::Serialize)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(parent, err))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, &payload)
            .await
            .map_err(|err| self.io_error(&temp, err))?;
        fs::rename(&temp, &self.path)
            .await
            .map_err(|err| self.io_error(&self.path, err))
    }
}

#[async_trait]
impl MetadataStore for JsonFileStore {
    async fn append(&self, record: ImageRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.read_records().await?;
        records.push(record);
        self.write_records(&records).await
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        self.read_records().await
    }
}
