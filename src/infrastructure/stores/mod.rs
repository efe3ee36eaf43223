#[cfg(test)]
#[path = "stores_test.rs"]
mod tests;

pub mod memory;
pub mod sled_store;

use std::path;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::models::AppError;

/// Key-value persistence used for snippets and stats. Values are JSON documents.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError>;

    fn set(&self, key: &str, value: &Value) -> Result<(), AppError>;

    /// Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), AppError>;

    /// All values whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Value>, AppError>;

    /// Replaces the value at `key` with `f(current)` as one atomic step.
    /// Concurrent updates to the same key never observe each other's
    /// intermediate state, so read-modify-write increments are not lost.
    /// When `f` fails the stored value is left as it was.
    fn update(&self, key: &str, f: &mut UpdateFn) -> Result<Value, AppError>;
}

pub type UpdateFn = dyn FnMut(Option<Value>) -> Result<Value, AppError> + Send;

pub type StoreBox = Arc<dyn KvStore + Send + Sync>;

pub struct StoreManager {}

impl StoreManager {
    pub fn in_memory() -> StoreBox {
        return Arc::new(memory::MemoryStore::default());
    }

    pub fn open(dir: &path::Path) -> Result<StoreBox, AppError> {
        return Ok(Arc::new(sled_store::SledStore::open(dir)?));
    }
}
