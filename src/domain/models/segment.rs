use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Prose,
    Code,
}

/// A contiguous span of a model reply, either prose or a fenced code block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSegment {
    pub kind: SegmentKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub language: Option<String>,
}

impl ContentSegment {
    pub fn prose(text: &str) -> ContentSegment {
        return ContentSegment {
            kind: SegmentKind::Prose,
            text: text.to_string(),
            language: None,
        };
    }

    pub fn code(language: &str, text: &str) -> ContentSegment {
        return ContentSegment {
            kind: SegmentKind::Code,
            text: text.to_string(),
            language: Some(language.to_string()),
        };
    }

    pub fn is_code(&self) -> bool {
        return self.kind == SegmentKind::Code;
    }
}
