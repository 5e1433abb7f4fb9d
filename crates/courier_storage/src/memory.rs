//! In-memory state store.

use crate::{StateStore, UpdateFn};
use courier_error::CourierResult;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

type ChannelData = BTreeMap<String, JsonValue>;

/// State store keeping every channel in process memory.
///
/// Suitable for tests and single-process bots that do not need state to
/// survive restarts.
///
/// # Example
///
/// ```
/// use courier_storage::{InMemoryStateStore, StateStore};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = InMemoryStateStore::new();
/// store.set("telegram.42", "lang", json!("en")).await.unwrap();
/// assert_eq!(store.get("telegram.42", "lang").await.unwrap(), Some(json!("en")));
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    channels: Mutex<HashMap<String, ChannelData>>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of channels holding at least one value.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().values().filter(|d| !d.is_empty()).count()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, channel: &str, key: &str) -> CourierResult<Option<JsonValue>> {
        Ok(self
            .channels
            .lock()
            .get(channel)
            .and_then(|data| data.get(key))
            .cloned())
    }

    async fn set(&self, channel: &str, key: &str, value: JsonValue) -> CourierResult<bool> {
        let mut channels = self.channels.lock();
        let existed = channels
            .entry(channel.to_string())
            .or_default()
            .insert(key.to_string(), value)
            .is_some();
        Ok(existed)
    }

    #[tracing::instrument(skip(self, updater))]
    async fn update(
        &self,
        channel: &str,
        key: &str,
        updater: UpdateFn,
    ) -> CourierResult<Option<JsonValue>> {
        let mut channels = self.channels.lock();
        let data = channels.entry(channel.to_string()).or_default();
        let current = data.get(key).cloned();

        let updated = updater(current)?;
        match &updated {
            Some(value) => {
                data.insert(key.to_string(), value.clone());
            }
            None => {
                data.remove(key);
            }
        }
        Ok(updated)
    }

    async fn delete(&self, channel: &str, key: &str) -> CourierResult<bool> {
        Ok(self
            .channels
            .lock()
            .get_mut(channel)
            .is_some_and(|data| data.remove(key).is_some()))
    }

    async fn keys(&self, channel: &str) -> CourierResult<Vec<String>> {
        Ok(self
            .channels
            .lock()
            .get(channel)
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, channel: &str) -> CourierResult<()> {
        self.channels.lock().remove(channel);
        Ok(())
    }
}
