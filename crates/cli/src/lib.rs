//! Manual test harness for MCP servers: the `omcp-inspect` binary.

pub mod client;
pub mod cmd;
pub mod error;

pub use error::Error;
