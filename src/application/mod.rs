pub mod cli;
mod logging;
mod render;
pub mod server;
