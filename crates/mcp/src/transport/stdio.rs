//! Line-delimited JSON over a byte stream.
//!
//! Each line carries exactly one JSON-RPC message. One stream is one
//! session: it starts uninitialized and is closed when the peer hangs up.

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

use crate::error::TransportError;
use crate::jsonrpc::JsonRpcMessage;
use crate::server::McpServer;
use crate::session::Session;
use crate::transport::codec::{Frame, MessageCodec};

/// Serve one session over the process's stdin and stdout.
pub async fn serve_stdio(server: McpServer) -> Result<(), TransportError> {
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve one session over an arbitrary reader and writer.
///
/// Lines that are oversized, not UTF-8 or not valid JSON-RPC messages are
/// logged and skipped. Returns when the reader reaches EOF or fails.
pub async fn serve<R, W>(server: McpServer, reader: R, writer: W) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    serve_with_codec(server, reader, writer, MessageCodec::new()).await
}

pub(crate) async fn serve_with_codec<R, W>(
    server: McpServer,
    reader: R,
    writer: W,
    codec: MessageCodec,
) -> Result<(), TransportError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = FramedRead::new(reader, codec);
    let mut sink = FramedWrite::new(writer, MessageCodec::new());
    let session = Session::new();
    info!(session = %session.id(), "stdio session started");

    while let Some(frame) = lines.next().await {
        let line = match frame? {
            Frame::Line(line) => line,
            Frame::Oversized => {
                warn!("skipping line over the length limit");
                continue;
            }
        };
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }

        let message: JsonRpcMessage = match serde_json::from_slice(trimmed) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "skipping malformed line");
                continue;
            }
        };

        if let Some(response) = server.handle(&session, message).await {
            let text = serde_json::to_string(&response)?;
            debug!(output = %text, "sending response");
            sink.send(text).await?;
        }
    }

    session.close();
    info!(session = %session.id(), "stdin closed, session ended");
    Ok(())
}
