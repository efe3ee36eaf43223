#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::AppError;
use crate::domain::models::StatField;
use crate::domain::models::UsageRecorder;
use crate::domain::models::UsageStats;
use crate::infrastructure::stores::StoreBox;

/// The single process-wide stats record lives under this key.
pub const STATS_KEY: &str = "user:stats";

// Unreadable records are an error, never zeros.
fn decode(value: Option<Value>) -> Result<UsageStats, AppError> {
    let Some(value) = value else {
        return Ok(UsageStats::default());
    };

    return serde_json::from_value::<UsageStats>(value).map_err(|err| {
        tracing::error!(error = ?err, "Stored stats are unreadable");
        return AppError::PersistenceError(format!("Stored stats are unreadable: {err}"));
    });
}

pub struct Stats {
    store: StoreBox,
}

impl Stats {
    pub fn new(store: StoreBox) -> Stats {
        return Stats { store };
    }

    /// Zeros when nothing has been recorded yet. Reading never creates the
    /// record.
    pub fn get(&self) -> Result<UsageStats, AppError> {
        return decode(self.store.get(STATS_KEY)?);
    }

    pub fn increment(&self, field: StatField, value: f64) -> Result<UsageStats, AppError> {
        field.check_increment(value)?;

        let res = self.store.update(STATS_KEY, &mut move |current| {
            let mut stats = decode(current)?;
            stats.apply(field, value)?;
            return serde_json::to_value(&stats).map_err(AppError::persistence);
        })?;

        let stats = decode(Some(res))?;
        tracing::debug!(%field, value, "Incremented stat");
        return Ok(stats);
    }
}

#[async_trait]
impl UsageRecorder for Stats {
    async fn increment(&self, field: StatField, value: f64) -> Result<UsageStats, AppError> {
        return Stats::increment(self, field, value);
    }
}
