//! Framing adapters around [`McpServer`](crate::server::McpServer).

pub mod childproc;
pub mod codec;
pub mod stdio;

pub use childproc::{ChildConnection, ChildProcess};
pub use stdio::{serve, serve_stdio};
