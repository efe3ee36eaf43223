mod code_action;
mod error;
mod gateway;
mod message;
mod segment;
mod snippet;
mod stats;

pub use code_action::*;
pub use error::*;
pub use gateway::*;
pub use message::*;
pub use segment::*;
pub use snippet::*;
pub use stats::*;
