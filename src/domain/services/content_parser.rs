#[cfg(test)]
#[path = "content_parser_test.rs"]
mod tests;

use crate::domain::models::ContentSegment;

const FENCE: &str = "```";
const DEFAULT_LANGUAGE: &str = "plaintext";

struct Fence<'a> {
    start: usize,
    end: usize,
    language: Option<&'a str>,
    body: &'a str,
}

fn is_tag_char(c: u8) -> bool {
    return c.is_ascii_alphanumeric() || matches!(c, b'_' | b'+' | b'#' | b'.' | b'-');
}

/// Reads the optional language tag and mandatory line break following an
/// opening marker. Returns the tag and the offset where the body begins.
fn parse_header(text: &str, from: usize) -> Option<(Option<&str>, usize)> {
    let bytes = text.as_bytes();
    let mut idx = from;
    while idx < bytes.len() && is_tag_char(bytes[idx]) {
        idx += 1;
    }

    let tag_end = idx;
    if idx < bytes.len() && bytes[idx] == b'\r' {
        idx += 1;
    }
    if idx >= bytes.len() || bytes[idx] != b'\n' {
        return None;
    }

    let language = if tag_end > from {
        Some(&text[from..tag_end])
    } else {
        None
    };

    return Some((language, idx + 1));
}

fn find_fence(text: &str, from: usize) -> Option<Fence<'_>> {
    let mut search = from;
    while let Some(rel) = text[search..].find(FENCE) {
        let start = search + rel;

        if let Some((language, body_start)) = parse_header(text, start + FENCE.len()) {
            // Any later opening marker would sit past this one, so a missing
            // closing marker here means no fence can close further on either.
            let close_rel = text[body_start..].find(FENCE)?;
            let body_end = body_start + close_rel;

            return Some(Fence {
                start,
                end: body_end + FENCE.len(),
                language,
                body: &text[body_start..body_end],
            });
        }

        search = start + 1;
    }

    return None;
}

/// Lazily splits a reply into prose and fenced code segments. Cheap to clone,
/// so a renderer can walk the same reply as often as it likes.
#[derive(Clone)]
pub struct Segments<'a> {
    text: &'a str,
    pos: usize,
    pending: Option<ContentSegment>,
    emitted: bool,
    done: bool,
}

impl<'a> Iterator for Segments<'a> {
    type Item = ContentSegment;

    fn next(&mut self) -> Option<ContentSegment> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }
        if self.done {
            return None;
        }

        match find_fence(self.text, self.pos) {
            Some(fence) => {
                let prose = &self.text[self.pos..fence.start];
                let code = ContentSegment::code(
                    fence.language.unwrap_or(DEFAULT_LANGUAGE),
                    fence.body.trim(),
                );
                self.pos = fence.end;
                self.emitted = true;

                if prose.is_empty() {
                    return Some(code);
                }

                self.pending = Some(code);
                return Some(ContentSegment::prose(prose));
            }
            None => {
                self.done = true;
                let rest = &self.text[self.pos..];

                // A reply without any fence is always a single prose segment,
                // even when empty.
                if rest.is_empty() && self.emitted {
                    return None;
                }

                self.emitted = true;
                return Some(ContentSegment::prose(rest));
            }
        }
    }
}

pub struct ContentParser {}

impl ContentParser {
    pub fn segments(text: &str) -> Segments<'_> {
        return Segments {
            text,
            pos: 0,
            pending: None,
            emitted: false,
            done: false,
        };
    }

    pub fn parse(text: &str) -> Vec<ContentSegment> {
        return ContentParser::segments(text).collect();
    }

    /// Only the code segments of a reply, in order.
    pub fn code_blocks(segments: &[ContentSegment]) -> Vec<&ContentSegment> {
        return segments
            .iter()
            .filter(|segment| return segment.is_code())
            .collect();
    }
}
