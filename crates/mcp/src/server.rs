//! JSON-RPC method dispatch for an MCP session.
//!
//! [`McpServer`] is transport independent: the stdio and HTTP adapters hand
//! it a decoded [`JsonRpcMessage`] together with the [`Session`] the message
//! belongs to, and frame whatever it returns.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::ProtocolError;
use crate::jsonrpc::{JSONRPC_VERSION, JsonRpcMessage};
use crate::protocol::{
    CallToolParams, Implementation, InitializeParams, InitializeResult, ListToolsResult,
    SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, ToolsCapability, method,
};
use crate::session::Session;
use crate::tool::ToolRegistry;

/// Static configuration of an MCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_info: Implementation,
    pub instructions: Option<String>,
    pub protocol_versions: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_info: Implementation::new("omcp", env!("CARGO_PKG_VERSION")),
            instructions: None,
            protocol_versions: SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

/// The session protocol: dispatches JSON-RPC methods against a tool catalog.
#[derive(Debug, Clone)]
pub struct McpServer {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ServerConfig,
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(config: ServerConfig, tools: ToolRegistry) -> Self {
        Self {
            inner: Arc::new(Inner { config, tools }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    /// Handle one incoming message on `session`.
    ///
    /// Returns the response to send, or `None` when the message was a
    /// notification or a response and nothing must be sent back. A returned
    /// response always carries the request's `id` unchanged.
    pub async fn handle(&self, session: &Session, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        if message.is_response() {
            debug!(session = %session.id(), id = ?message.id, "ignoring response from client");
            return None;
        }

        let JsonRpcMessage {
            jsonrpc,
            id,
            method,
            params,
            ..
        } = message;

        let outcome = if jsonrpc != JSONRPC_VERSION {
            Err(ProtocolError::InvalidRequest(format!(
                "unsupported jsonrpc version: {jsonrpc}"
            )))
        } else {
            match method {
                Some(method) => self.dispatch(session, &method, params, id.is_none()).await,
                None => Err(ProtocolError::InvalidRequest("missing method".into())),
            }
        };

        match id {
            Some(id) => Some(match outcome {
                Ok(result) => JsonRpcMessage::response(id, result),
                Err(err) => {
                    debug!(session = %session.id(), %id, error = %err, "request failed");
                    JsonRpcMessage::error_response(id, err.to_jsonrpc())
                }
            }),
            None => {
                if let Err(err) = outcome {
                    warn!(session = %session.id(), error = %err, "notification failed");
                }
                None
            }
        }
    }

    async fn dispatch(
        &self,
        session: &Session,
        method: &str,
        params: Option<Value>,
        notification: bool,
    ) -> Result<Value, ProtocolError> {
        if notification {
            session.ensure_open()?;
            match method {
                method::INITIALIZED => debug!(session = %session.id(), "client initialized"),
                other => debug!(session = %session.id(), method = %other, "unhandled notification"),
            }
            return Ok(Value::Null);
        }

        match method {
            method::INITIALIZE => self.initialize(session, parse_params(params)?),
            method::PING => {
                session.ensure_open()?;
                Ok(json!({}))
            }
            method::TOOLS_LIST => {
                session.ensure_ready()?;
                to_value(ListToolsResult {
                    tools: self.inner.tools.list(),
                })
            }
            method::TOOLS_CALL => {
                session.ensure_ready()?;
                self.call_tool(session, parse_params(params)?).await
            }
            other => {
                session.ensure_open()?;
                Err(ProtocolError::MethodNotFound(other.to_string()))
            }
        }
    }

    fn initialize(&self, session: &Session, params: InitializeParams) -> Result<Value, ProtocolError> {
        let config = &self.inner.config;
        if !config
            .protocol_versions
            .iter()
            .any(|v| *v == params.protocol_version)
        {
            session.ensure_open()?;
            return Err(ProtocolError::UnsupportedProtocolVersion {
                requested: params.protocol_version,
                supported: config.protocol_versions.clone(),
            });
        }

        session.initialize(params.protocol_version.clone(), params.client_info.clone())?;
        info!(
            session = %session.id(),
            client = %params.client_info.name,
            version = %params.protocol_version,
            "session initialized"
        );

        to_value(InitializeResult {
            protocol_version: params.protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: config.server_info.clone(),
            instructions: config.instructions.clone(),
        })
    }

    async fn call_tool(&self, session: &Session, params: CallToolParams) -> Result<Value, ProtocolError> {
        let tool = self
            .inner
            .tools
            .get(&params.name)
            .ok_or_else(|| ProtocolError::ToolNotFound(params.name.clone()))?;
        debug!(session = %session.id(), tool = %params.name, "calling tool");
        let result = tool.call(params.arguments.unwrap_or_default()).await?;
        to_value(result)
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, ProtocolError> {
    let params = params.ok_or_else(|| ProtocolError::InvalidParams("missing params".into()))?;
    serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParams(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError::Internal(e.to_string()))
}
