//! MCP session protocol.
//!
//! JSON-RPC 2.0 framing, the per-session lifecycle, an explicit tool
//! registry and the stdio transport. HTTP hosting and authorization live in
//! `omcp-axum` and `omcp-auth`.

pub mod error;
pub mod jsonrpc;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tool;
pub mod transport;

pub use error::{ProtocolError, TransportError};
pub use jsonrpc::{JsonRpcError, JsonRpcMessage, RequestId};
pub use server::{McpServer, ServerConfig};
pub use session::{Session, SessionPhase, SessionTable};
pub use tool::{Tool, ToolRegistry};
