use chrono::DateTime;
use chrono::Utc;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use super::CodeAction;

/// A saved action result. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub title: String,
    pub language: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// The user-provided part of a snippet, before the store assigns an id and
/// timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetDraft {
    pub title: String,
    pub language: String,
    pub code: String,
}

impl SnippetDraft {
    pub fn from_outcome(action: CodeAction, language: &str, raw: &str) -> SnippetDraft {
        return SnippetDraft {
            title: format!("{} Result", action.title()),
            language: language.to_string(),
            code: raw.to_string(),
        };
    }
}
