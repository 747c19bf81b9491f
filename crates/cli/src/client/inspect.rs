//! [`Inspect`] trait for driving a connected MCP server.

use crate::client::{Connection, HttpClient};
use crate::error::Error;
use omcp::protocol::{CallToolResult, LATEST_PROTOCOL_VERSION, ListToolsResult, ToolInfo, method};
use omcp::transport::ChildConnection;
use serde_json::{Map, Value, json};

const CLIENT_NAME: &str = "omcp-inspect";

/// Session operations common to every transport.
pub trait Inspect {
    /// Run the `initialize` handshake and return the server's result.
    fn initialize(&mut self) -> impl Future<Output = Result<Value, Error>> + Send;

    /// List all tools exposed by the server.
    fn list_tools(&mut self) -> impl Future<Output = Result<Vec<ToolInfo>, Error>> + Send;

    /// Call a tool with arguments.
    fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<CallToolResult, Error>> + Send;

    /// End the session.
    fn close(self) -> impl Future<Output = Result<(), Error>> + Send;
}

fn client_info() -> Value {
    json!({"name": CLIENT_NAME, "version": env!("CARGO_PKG_VERSION")})
}

impl Inspect for HttpClient {
    async fn initialize(&mut self) -> Result<Value, Error> {
        let result = self
            .send_request(
                method::INITIALIZE,
                Some(json!({
                    "protocolVersion": LATEST_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": client_info(),
                })),
            )
            .await?;
        self.send_notification(method::INITIALIZED, None).await?;
        Ok(result)
    }

    async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, Error> {
        let result = self.send_request(method::TOOLS_LIST, None).await?;
        Ok(serde_json::from_value::<ListToolsResult>(result)?.tools)
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, Error> {
        let result = self
            .send_request(
                method::TOOLS_CALL,
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn close(mut self) -> Result<(), Error> {
        HttpClient::close(&mut self).await
    }
}

impl Inspect for ChildConnection {
    async fn initialize(&mut self) -> Result<Value, Error> {
        Ok(ChildConnection::initialize(self, CLIENT_NAME, env!("CARGO_PKG_VERSION")).await?)
    }

    async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, Error> {
        let result = ChildConnection::list_tools(self).await?;
        Ok(serde_json::from_value::<ListToolsResult>(result)?.tools)
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, Error> {
        let result = ChildConnection::call_tool(self, name, Value::Object(arguments)).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn close(self) -> Result<(), Error> {
        Ok(self.shutdown().await?)
    }
}

impl Inspect for Connection {
    async fn initialize(&mut self) -> Result<Value, Error> {
        match self {
            Connection::Http(client) => Inspect::initialize(client).await,
            Connection::Stdio(child) => Inspect::initialize(child).await,
        }
    }

    async fn list_tools(&mut self) -> Result<Vec<ToolInfo>, Error> {
        match self {
            Connection::Http(client) => Inspect::list_tools(client).await,
            Connection::Stdio(child) => Inspect::list_tools(child).await,
        }
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<CallToolResult, Error> {
        match self {
            Connection::Http(client) => Inspect::call_tool(client, name, arguments).await,
            Connection::Stdio(child) => Inspect::call_tool(child, name, arguments).await,
        }
    }

    async fn close(self) -> Result<(), Error> {
        match self {
            Connection::Http(client) => Inspect::close(client).await,
            Connection::Stdio(child) => Inspect::close(child).await,
        }
    }
}
