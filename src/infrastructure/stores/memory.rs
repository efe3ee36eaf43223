use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use super::KvStore;
use super::UpdateFn;
use crate::domain::models::AppError;

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, Value>,
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        return Ok(self.map.get(key).map(|val| return val.value().clone()));
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), AppError> {
        self.map.insert(key.to_string(), value.clone());
        return Ok(());
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        self.map.remove(key);
        return Ok(());
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Value>, AppError> {
        let mut entries = self
            .map
            .iter()
            .filter(|entry| return entry.key().starts_with(prefix))
            .map(|entry| return (entry.key().to_string(), entry.value().clone()))
            .collect::<Vec<(String, Value)>>();

        entries.sort_by(|a, b| return a.0.cmp(&b.0));

        return Ok(entries.into_iter().map(|(_, val)| return val).collect());
    }

    // The shard lock is held while `f` runs, `f` must not touch this store.
    fn update(&self, key: &str, f: &mut UpdateFn) -> Result<Value, AppError> {
        match self.map.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let next = f(Some(occupied.get().clone()))?;
                occupied.insert(next.clone());
                return Ok(next);
            }
            Entry::Vacant(vacant) => {
                let next = f(None)?;
                vacant.insert(next.clone());
                return Ok(next);
            }
        }
    }
}
