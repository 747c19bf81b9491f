//! Client side of the stdio transport: drive an MCP server running as a
//! child process.

use std::process::Stdio;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::jsonrpc::{JsonRpcMessage, RequestId};
use crate::protocol::{LATEST_PROTOCOL_VERSION, method};
use crate::transport::codec::{Frame, MessageCodec};

/// Builder for a child process server.
#[derive(Debug, Clone)]
pub struct ChildProcess {
    program: String,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ChildProcess {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Spawn the process with piped stdin and stdout. Stderr is inherited.
    pub fn spawn(self) -> Result<ChildConnection, TransportError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        info!(program = %self.program, "spawned child process");

        let stdin = child.stdin.take().ok_or(TransportError::Closed)?;
        let stdout = child.stdout.take().ok_or(TransportError::Closed)?;
        Ok(ChildConnection {
            child,
            writer: FramedWrite::new(stdin, MessageCodec::new()),
            reader: FramedRead::new(stdout, MessageCodec::new()),
            next_id: 1,
        })
    }
}

/// An open session with a child process server.
pub struct ChildConnection {
    child: Child,
    writer: FramedWrite<ChildStdin, MessageCodec>,
    reader: FramedRead<ChildStdout, MessageCodec>,
    next_id: i64,
}

impl ChildConnection {
    async fn write(&mut self, message: &JsonRpcMessage) -> Result<(), TransportError> {
        let text = serde_json::to_string(message)?;
        self.writer.send(text).await?;
        Ok(())
    }

    /// Send a request and wait for the response carrying the same id.
    ///
    /// Lines that do not parse and messages for other ids are skipped.
    pub async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<Value, TransportError> {
        let id = RequestId::from(self.next_id);
        self.next_id += 1;
        debug!(%method, %id, "sending request to child");
        self.write(&JsonRpcMessage::request(id.clone(), method, params))
            .await?;

        while let Some(frame) = self.reader.next().await {
            let line = match frame? {
                Frame::Line(line) => line,
                Frame::Oversized => {
                    warn!("skipping oversized line from child");
                    continue;
                }
            };
            let message: JsonRpcMessage = match serde_json::from_slice(line.trim_ascii()) {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "skipping malformed line from child");
                    continue;
                }
            };
            if message.is_response() && message.id.as_ref() == Some(&id) {
                return Ok(message.into_result()?);
            }
            debug!(id = ?message.id, "skipping unrelated message from child");
        }
        Err(TransportError::Closed)
    }

    pub async fn send_notification(&mut self, method: &str, params: Option<Value>) -> Result<(), TransportError> {
        debug!(%method, "sending notification to child");
        self.write(&JsonRpcMessage::notification(method, params))
            .await
    }

    /// Run the handshake: `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&mut self, client_name: &str, client_version: &str) -> Result<Value, TransportError> {
        let result = self
            .send_request(
                method::INITIALIZE,
                Some(json!({
                    "protocolVersion": LATEST_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": client_name, "version": client_version}
                })),
            )
            .await?;
        self.send_notification(method::INITIALIZED, None).await?;
        Ok(result)
    }

    pub async fn list_tools(&mut self) -> Result<Value, TransportError> {
        self.send_request(method::TOOLS_LIST, None).await
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value, TransportError> {
        self.send_request(
            method::TOOLS_CALL,
            Some(json!({"name": name, "arguments": arguments})),
        )
        .await
    }

    /// Close stdin and wait for the child to exit, killing it after a grace
    /// period.
    pub async fn shutdown(self) -> Result<(), TransportError> {
        let ChildConnection {
            mut child, writer, ..
        } = self;
        drop(writer);

        match tokio::time::timeout(Duration::from_secs(5), child.wait()).await {
            Ok(status) => {
                let status = status?;
                info!(?status, "child process exited");
                Ok(())
            }
            Err(_) => {
                warn!("child process did not exit, killing");
                child.kill().await?;
                Ok(())
            }
        }
    }
}
