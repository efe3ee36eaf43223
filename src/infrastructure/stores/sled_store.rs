use std::path;

use serde_json::Value;

use super::KvStore;
use super::UpdateFn;
use crate::domain::models::AppError;

fn decode(bytes: &[u8]) -> Result<Value, AppError> {
    return serde_json::from_slice::<Value>(bytes).map_err(AppError::persistence);
}

fn encode(value: &Value) -> Result<Vec<u8>, AppError> {
    return serde_json::to_vec(value).map_err(AppError::persistence);
}

/// Embedded on-disk store backed by sled.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(dir: &path::Path) -> Result<SledStore, AppError> {
        let db = sled::open(dir).map_err(|err| {
            tracing::error!(error = ?err, path = ?dir, "Failed to open store");
            return AppError::persistence(err);
        })?;

        return Ok(SledStore { db });
    }

    fn flush(&self) -> Result<(), AppError> {
        self.db.flush().map_err(AppError::persistence)?;
        return Ok(());
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let res = self.db.get(key).map_err(AppError::persistence)?;
        return res.map(|bytes| return decode(&bytes)).transpose();
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), AppError> {
        self.db
            .insert(key, encode(value)?)
            .map_err(AppError::persistence)?;
        return self.flush();
    }

    fn delete(&self, key: &str) -> Result<(), AppError> {
        self.db.remove(key).map_err(AppError::persistence)?;
        return self.flush();
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Value>, AppError> {
        let mut values = vec![];
        for item in self.db.scan_prefix(prefix) {
            let (_, bytes) = item.map_err(AppError::persistence)?;
            values.push(decode(&bytes)?);
        }

        return Ok(values);
    }

    // sled retries `f` until its compare-and-swap wins, so `f` may run more
    // than once per call.
    fn update(&self, key: &str, f: &mut UpdateFn) -> Result<Value, AppError> {
        let mut failure: Option<AppError> = None;

        let res = self
            .db
            .update_and_fetch(key, |old: Option<&[u8]>| {
                let current = match old.map(decode).transpose() {
                    Ok(current) => current,
                    Err(err) => {
                        failure = Some(err);
                        return old.map(|bytes| return bytes.to_vec());
                    }
                };

                match f(current).and_then(|next| return encode(&next)) {
                    Ok(bytes) => {
                        failure = None;
                        return Some(bytes);
                    }
                    Err(err) => {
                        failure = Some(err);
                        return old.map(|bytes| return bytes.to_vec());
                    }
                }
            })
            .map_err(AppError::persistence)?;

        if let Some(err) = failure {
            return Err(err);
        }

        self.flush()?;

        return match res {
            Some(bytes) => decode(&bytes),
            None => Err(AppError::PersistenceError(format!(
                "update of '{key}' produced no value"
            ))),
        };
    }
}
