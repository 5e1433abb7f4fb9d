//! Filesystem-based state store.
//!
//! Each channel is stored as one JSON document named by the SHA-256 hash of
//! the channel identity, so arbitrary channel strings map to safe file names.

use crate::{StateStore, UpdateFn};
use courier_error::{CourierResult, StateError, StateErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// On-disk document of one channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ChannelDocument {
    channel: String,
    data: BTreeMap<String, JsonValue>,
}

/// Filesystem state store.
///
/// Layout: `{base_path}/{hash[0:2]}/{hash}.json`.
///
/// - **Atomic writes**: temp file + rename, so readers never see partial documents
/// - **Serialized access**: operations on one channel are serialized within the process
///
/// # Example
///
/// ```no_run
/// use courier_storage::{FileSystemStateStore, StateStore};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FileSystemStateStore::new("/var/lib/courier/state")?;
/// store.set("graph.page.42", "greeted", json!(true)).await?;
/// # Ok(())
/// # }
/// ```
pub struct FileSystemStateStore {
    base_path: PathBuf,
    locks: parking_lot::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSystemStateStore {
    /// Create a new filesystem state store.
    ///
    /// Creates the base directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> CourierResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StateError::new(StateErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::info!(path = %base_path.display(), "Created filesystem state store");
        Ok(Self {
            base_path,
            locks: parking_lot::Mutex::new(HashMap::new()),
        })
    }

    /// Root directory of the store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn compute_hash(channel: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(channel.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Path of the document holding a channel.
    pub fn channel_path(&self, channel: &str) -> PathBuf {
        let hash = Self::compute_hash(channel);
        self.base_path.join(&hash[0..2]).join(format!("{}.json", hash))
    }

    /// Channels with an operation in flight or waiting for their lock.
    pub fn locked_channels(&self) -> usize {
        self.locks.lock().len()
    }

    async fn lock_channel<'a>(&'a self, channel: &'a str) -> ChannelGuard<'a> {
        let lock = self
            .locks
            .lock()
            .entry(channel.to_string())
            .or_default()
            .clone();
        ChannelGuard {
            store: self,
            channel,
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn read_document(&self, channel: &str) -> CourierResult<ChannelDocument> {
        let path = self.channel_path(channel);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ChannelDocument {
                    channel: channel.to_string(),
                    data: BTreeMap::new(),
                });
            }
            Err(e) => {
                return Err(StateError::new(StateErrorKind::Read(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
                .into());
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| {
            StateError::new(StateErrorKind::Corrupted(format!("{}: {}", path.display(), e))).into()
        })
    }

    async fn write_document(&self, document: &ChannelDocument) -> CourierResult<()> {
        let path = self.channel_path(&document.channel);

        if document.data.is_empty() {
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StateError::new(StateErrorKind::Write(format!(
                    "remove {}: {}",
                    path.display(),
                    e
                )))
                .into()),
            };
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StateError::new(StateErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let bytes = serde_json::to_vec_pretty(document).map_err(|e| {
            StateError::new(StateErrorKind::Write(format!("serialize {}: {}", document.channel, e)))
        })?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&temp_path, &bytes).await.map_err(|e| {
            StateError::new(StateErrorKind::Write(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;

        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StateError::new(StateErrorKind::Write(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(
            channel = %document.channel,
            path = %path.display(),
            keys = document.data.len(),
            "Wrote channel state"
        );
        Ok(())
    }
}

/// Exclusive access to one channel document.
///
/// The lock entry is dropped from the table once nobody else holds or awaits it.
struct ChannelGuard<'a> {
    store: &'a FileSystemStateStore,
    channel: &'a str,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for ChannelGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.store.locks.lock();
        if locks
            .get(self.channel)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(self.channel);
        }
    }
}

#[async_trait::async_trait]
impl StateStore for FileSystemStateStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, channel: &str, key: &str) -> CourierResult<Option<JsonValue>> {
        let _guard = self.lock_channel(channel).await;
        Ok(self.read_document(channel).await?.data.remove(key))
    }

    #[tracing::instrument(skip(self, value))]
    async fn set(&self, channel: &str, key: &str, value: JsonValue) -> CourierResult<bool> {
        let _guard = self.lock_channel(channel).await;
        let mut document = self.read_document(channel).await?;
        let existed = document.data.insert(key.to_string(), value).is_some();
        self.write_document(&document).await?;
        Ok(existed)
    }

    #[tracing::instrument(skip(self, updater))]
    async fn update(
        &self,
        channel: &str,
        key: &str,
        updater: UpdateFn,
    ) -> CourierResult<Option<JsonValue>> {
        let _guard = self.lock_channel(channel).await;
        let mut document = self.read_document(channel).await?;

        let updated = updater(document.data.remove(key))?;
        if let Some(value) = &updated {
            document.data.insert(key.to_string(), value.clone());
        }
        self.write_document(&document).await?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, channel: &str, key: &str) -> CourierResult<bool> {
        let _guard = self.lock_channel(channel).await;
        let mut document = self.read_document(channel).await?;
        if document.data.remove(key).is_none() {
            return Ok(false);
        }
        self.write_document(&document).await?;
        Ok(true)
    }

    #[tracing::instrument(skip(self))]
    async fn keys(&self, channel: &str) -> CourierResult<Vec<String>> {
        let _guard = self.lock_channel(channel).await;
        Ok(self.read_document(channel).await?.data.into_keys().collect())
    }

    #[tracing::instrument(skip(self))]
    async fn clear(&self, channel: &str) -> CourierResult<()> {
        let _guard = self.lock_channel(channel).await;
        self.write_document(&ChannelDocument {
            channel: channel.to_string(),
            data: BTreeMap::new(),
        })
        .await
    }
}
