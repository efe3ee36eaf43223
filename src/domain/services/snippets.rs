#[cfg(test)]
#[path = "snippets_test.rs"]
mod tests;

use std::sync::Mutex;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::models::AppError;
use crate::domain::models::Snippet;
use crate::domain::models::SnippetDraft;
use crate::infrastructure::stores::StoreBox;

pub const SNIPPET_PREFIX: &str = "snippet:";

pub struct Snippets {
    store: StoreBox,
    last_created: Mutex<DateTime<Utc>>,
}

impl Snippets {
    pub fn new(store: StoreBox) -> Snippets {
        return Snippets {
            store,
            last_created: Mutex::new(DateTime::<Utc>::MIN_UTC),
        };
    }

    fn create_id(created_at: &DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4()
            .to_string()
            .split('-')
            .next()
            .unwrap_or_default()
            .to_string();

        return format!(
            "{SNIPPET_PREFIX}{}-{suffix}",
            created_at.timestamp_millis()
        );
    }

    /// Wall-clock time, nudged forward so every save sorts after the previous
    /// one even if the clock steps backwards.
    fn next_timestamp(&self) -> Result<DateTime<Utc>, AppError> {
        let mut last = self
            .last_created
            .lock()
            .map_err(|err| return AppError::persistence(err.to_string()))?;

        let mut now = Utc::now();
        if now <= *last {
            now = *last + Duration::microseconds(1);
        }
        *last = now;

        return Ok(now);
    }

    /// Every saved snippet, most recent first.
    pub fn list(&self) -> Result<Vec<Snippet>, AppError> {
        let mut snippets = vec![];
        for value in self.store.scan_prefix(SNIPPET_PREFIX)? {
            match serde_json::from_value::<Snippet>(value) {
                Ok(snippet) => snippets.push(snippet),
                Err(err) => {
                    tracing::warn!(error = ?err, "Skipping unreadable snippet");
                }
            }
        }

        snippets.sort_by(|a, b| {
            return b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| return b.id.cmp(&a.id));
        });

        return Ok(snippets);
    }

    pub fn save(&self, draft: &SnippetDraft) -> Result<Snippet, AppError> {
        let created_at = self.next_timestamp()?;
        let snippet = Snippet {
            id: Snippets::create_id(&created_at),
            title: draft.title.to_string(),
            language: draft.language.to_string(),
            code: draft.code.to_string(),
            created_at,
        };

        let value = serde_json::to_value(&snippet).map_err(AppError::persistence)?;
        self.store.set(&snippet.id, &value)?;

        tracing::info!(id = snippet.id, language = snippet.language, "Saved snippet");
        return Ok(snippet);
    }

    /// Idempotent. Ids outside the snippet namespace are ignored so this can
    /// never reach other records in the store.
    pub fn delete(&self, id: &str) -> Result<(), AppError> {
        if !id.starts_with(SNIPPET_PREFIX) {
            tracing::debug!(id, "Ignoring delete outside the snippet namespace");
            return Ok(());
        }

        self.store.delete(id)?;
        return Ok(());
    }
}
