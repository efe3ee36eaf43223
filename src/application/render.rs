#[cfg(test)]
#[path = "render_test.rs"]
mod tests;

use yansi::Paint;

use crate::domain::models::ContentSegment;

/// Lays out parsed segments for a terminal. Code blocks are numbered from 1 so
/// they can be picked with `--copy-code`.
pub fn render_segments(segments: &[ContentSegment]) -> String {
    let mut res = vec![];
    let mut block = 0;

    for segment in segments {
        if !segment.is_code() {
            res.push(segment.text.trim_matches('\n').to_string());
            continue;
        }

        block += 1;
        let language = segment.language.as_deref().unwrap_or("plaintext");
        let header = Paint::cyan(format!("({block}) {language}")).bold();
        let body = segment
            .text
            .lines()
            .map(|line| return format!("  {line}"))
            .collect::<Vec<String>>()
            .join("\n");

        res.push(format!("{header}\n{body}"));
    }

    return res
        .into_iter()
        .filter(|part| return !part.is_empty())
        .collect::<Vec<String>>()
        .join("\n\n");
}

pub fn render_warning(text: &str) -> String {
    return Paint::yellow(format!("warning: {text}")).to_string();
}
