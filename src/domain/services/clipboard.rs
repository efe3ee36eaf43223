use anyhow::Result;

pub struct ClipboardService {}

impl ClipboardService {
    /// Copies `text` to the system clipboard. The CLI exits right after, so
    /// the clipboard handle is created per call.
    pub fn set(text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        tracing::debug!(length = text.len(), "Copied to clipboard");
        return Ok(());
    }
}
