use serde_derive::Deserialize;
use serde_derive::Serialize;
use strum::EnumIter;
use strum::EnumString;
use strum::EnumVariantNames;

use super::AppError;

/// Hours credited to the user for every completed code action.
pub const TIME_SAVED_PER_ACTION: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default)]
    pub code_generated: u64,
    #[serde(default)]
    pub tasks_completed: u64,
    #[serde(default)]
    pub time_saved: f64,
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    EnumVariantNames,
    strum::Display,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum StatField {
    CodeGenerated,
    TasksCompleted,
    TimeSaved,
}

impl StatField {
    /// Rejects increments that would break the non-negative, whole-number
    /// shape of the counters.
    pub fn check_increment(&self, value: f64) -> Result<(), AppError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Increment for {self} must be a non-negative number, got {value}"
            )));
        }

        if *self == StatField::TimeSaved {
            return Ok(());
        }

        if value.fract() != 0.0 {
            return Err(AppError::InvalidInput(format!(
                "Increment for {self} must be a whole number, got {value}"
            )));
        }

        // 2^64 is the first float above u64::MAX.
        if value >= u64::MAX as f64 {
            return Err(AppError::InvalidInput(format!(
                "Increment for {self} is too large, got {value}"
            )));
        }

        return Ok(());
    }
}

fn overflow(field: StatField) -> AppError {
    return AppError::InvalidInput(format!("Incrementing {field} would overflow it"));
}

fn add_count(field: StatField, current: u64, value: f64) -> Result<u64, AppError> {
    return current
        .checked_add(value as u64)
        .ok_or_else(|| return overflow(field));
}

impl UsageStats {
    /// Adds an already checked increment. Fails without touching `self` when
    /// the result no longer fits the field.
    pub fn apply(&mut self, field: StatField, value: f64) -> Result<(), AppError> {
        match field {
            StatField::CodeGenerated => {
                self.code_generated = add_count(field, self.code_generated, value)?;
            }
            StatField::TasksCompleted => {
                self.tasks_completed = add_count(field, self.tasks_completed, value)?;
            }
            StatField::TimeSaved => {
                let next = self.time_saved + value;
                if !next.is_finite() {
                    return Err(overflow(field));
                }
                self.time_saved = next;
            }
        }

        return Ok(());
    }
}
