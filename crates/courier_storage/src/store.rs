//! State store trait definition.

use courier_error::CourierResult;
use serde_json::Value as JsonValue;

/// Atomic read-modify-write of one stored value.
///
/// Receives the current value and returns the new one; returning `None`
/// deletes the entry. An error aborts the update and leaves the value
/// unchanged.
pub type UpdateFn =
    Box<dyn FnOnce(Option<JsonValue>) -> CourierResult<Option<JsonValue>> + Send>;

/// Key-value storage scoped by channel identity.
///
/// Backs both script runtime persistence and platform bookkeeping. Every
/// operation on one channel observes the effects of earlier completed
/// operations on it.
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Read a value.
    async fn get(&self, channel: &str, key: &str) -> CourierResult<Option<JsonValue>>;

    /// Write a value, returning whether the key already existed.
    async fn set(&self, channel: &str, key: &str, value: JsonValue) -> CourierResult<bool>;

    /// Atomically replace a value with the result of `updater`.
    ///
    /// No other operation on the same key interleaves between reading the
    /// old value and storing the new one. Returns the stored value.
    async fn update(
        &self,
        channel: &str,
        key: &str,
        updater: UpdateFn,
    ) -> CourierResult<Option<JsonValue>>;

    /// Delete a value, returning whether it existed.
    async fn delete(&self, channel: &str, key: &str) -> CourierResult<bool>;

    /// Keys stored for a channel, sorted.
    async fn keys(&self, channel: &str) -> CourierResult<Vec<String>>;

    /// Delete every value of a channel.
    async fn clear(&self, channel: &str) -> CourierResult<()>;
}

/// Box a closure as an [`UpdateFn`].
///
/// ```
/// use courier_storage::updater;
/// use serde_json::json;
///
/// let increment = updater(|current| {
///     Ok(Some(json!(current.and_then(|v| v.as_u64()).unwrap_or(0) + 1)))
/// });
/// assert_eq!(increment(None).unwrap(), Some(json!(1)));
/// ```
pub fn updater<F>(f: F) -> UpdateFn
where
    F: FnOnce(Option<JsonValue>) -> CourierResult<Option<JsonValue>> + Send + 'static,
{
    Box::new(f)
}
