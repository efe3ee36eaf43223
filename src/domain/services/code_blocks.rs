use super::ContentParser;
use crate::domain::models::AppError;
use crate::domain::models::ContentSegment;

#[cfg(test)]
#[path = "code_blocks_test.rs"]
mod tests;

/// The code segments of a single reply, numbered from 1 for selection.
#[derive(Default)]
pub struct CodeBlocks {
    codeblocks: Vec<String>,
}

fn parse_index(value: &str) -> Result<usize, AppError> {
    let index = value.trim().parse::<usize>().map_err(|_| {
        return AppError::InvalidInput(format!("'{value}' is not a code block number"));
    })?;

    if index == 0 {
        return Err(AppError::invalid_input("Code block numbers start at 1"));
    }

    return Ok(index - 1);
}

impl CodeBlocks {
    pub fn from_segments(segments: &[ContentSegment]) -> CodeBlocks {
        return CodeBlocks {
            codeblocks: ContentParser::code_blocks(segments)
                .iter()
                .map(|segment| return segment.text.to_string())
                .collect(),
        };
    }

    pub fn is_empty(&self) -> bool {
        return self.codeblocks.is_empty();
    }

    fn checked_index(&self, value: &str) -> Result<usize, AppError> {
        let index = parse_index(value)?;
        if index >= self.codeblocks.len() {
            return Err(AppError::InvalidInput(format!(
                "Code block {} does not exist, the reply has {}",
                index + 1,
                self.codeblocks.len()
            )));
        }

        return Ok(index);
    }

    /// Joins the selected blocks. The selection accepts `2`, `1,3`, `2..4`
    /// (inclusive) or nothing at all for the last block.
    pub fn select(&self, selection: &str) -> Result<String, AppError> {
        if self.is_empty() {
            return Err(AppError::invalid_input("The reply contains no code blocks"));
        }

        let selection = selection.trim();
        if selection.is_empty() {
            return Ok(self.codeblocks[self.codeblocks.len() - 1].to_string());
        }

        let mut indexes = vec![];
        for part in selection.split(',') {
            let part = part.trim();
            if let Some((first, last)) = part.split_once("..") {
                let first = self.checked_index(first)?;
                let last = self.checked_index(last)?;
                if first > last {
                    return Err(AppError::InvalidInput(format!(
                        "Code block range '{part}' is reversed"
                    )));
                }
                indexes.extend(first..=last);
            } else {
                indexes.push(self.checked_index(part)?);
            }
        }

        let res = indexes
            .iter()
            .map(|idx| return self.codeblocks[*idx].to_string())
            .collect::<Vec<String>>()
            .join("\n\n");

        return Ok(res);
    }
}
