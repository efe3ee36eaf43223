pub mod clipboard;
mod code_blocks;
mod content_parser;
mod dispatcher;
mod snippets;
mod stats;

pub use code_blocks::*;
pub use content_parser::*;
pub use dispatcher::*;
pub use snippets::*;
pub use stats::*;
