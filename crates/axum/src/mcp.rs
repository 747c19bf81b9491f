//! MCP over HTTP: one JSON-RPC message per POST, sessions correlated by
//! the `Mcp-Session-Id` header.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Extension, Json, Router};
use http::{HeaderMap, HeaderValue, StatusCode};
use omcp::jsonrpc::{JsonRpcError, JsonRpcMessage, RequestId};
use omcp::protocol::method;
use omcp::{McpServer, ProtocolError, Session, SessionPhase, SessionTable};
use omcp_auth::Grant;
use tracing::{debug, info, warn};

pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";
pub const MCP_PATH: &str = "/mcp";

#[derive(Clone)]
struct McpState {
    server: McpServer,
    sessions: SessionTable,
}

/// Router serving the MCP endpoint at `/mcp`.
///
/// - `POST` carries one JSON-RPC message. Requests get 200 with the
///   response; notifications and client responses get 202.
/// - `DELETE` closes the session named by `Mcp-Session-Id`.
/// - `GET` is 405: no server-initiated stream is offered.
pub fn mcp_router(server: McpServer, sessions: SessionTable) -> Router {
    Router::new()
        .route(
            MCP_PATH,
            post(handle_post)
                .delete(handle_delete)
                .get(|| async { StatusCode::METHOD_NOT_ALLOWED }),
        )
        .with_state(McpState { server, sessions })
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MCP_SESSION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
}

async fn handle_post(
    State(state): State<McpState>,
    headers: HeaderMap,
    grant: Option<Extension<Grant>>,
    body: Bytes,
) -> Response {
    let message: JsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "malformed request body");
            let error = JsonRpcMessage::error_response(
                RequestId::Null,
                JsonRpcError::parse_error(format!("malformed message: {err}")),
            );
            return (StatusCode::BAD_REQUEST, Json(error)).into_response();
        }
    };
    if let Some(Extension(grant)) = &grant {
        debug!(client_id = %grant.client_id, method = ?message.method, "authorized request");
    }

    let initialize =
        message.method.as_deref() == Some(method::INITIALIZE) && message.id.is_some();

    let session = match session_id(&headers) {
        Some(id) => match state.sessions.get(id) {
            Some(session) => session,
            None => return reject(message, format!("unknown session: {id}")),
        },
        None if initialize => Session::new(),
        None => return reject(message, "missing Mcp-Session-Id header".into()),
    };

    let was_uninitialized = session.phase() == SessionPhase::Uninitialized;
    let response = state.server.handle(&session, message).await;

    let mut http_response = match response {
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    };

    // A session only enters the table once its handshake succeeded.
    if initialize && was_uninitialized && session.phase() == SessionPhase::Initialized {
        if state.sessions.insert(session.clone()) {
            info!(session = %session.id(), "http session created");
        }
        if let Ok(value) = HeaderValue::from_str(session.id()) {
            http_response
                .headers_mut()
                .insert(MCP_SESSION_ID_HEADER, value);
        }
    }
    http_response
}

/// Answer a request that cannot be tied to a session. Protocol-level, so
/// still HTTP 200.
fn reject(message: JsonRpcMessage, reason: String) -> Response {
    debug!(%reason, "request without a usable session");
    match message.id {
        Some(id) if message.method.is_some() => {
            let error = ProtocolError::InvalidRequest(reason).to_jsonrpc();
            (StatusCode::OK, Json(JsonRpcMessage::error_response(id, error))).into_response()
        }
        _ => StatusCode::ACCEPTED.into_response(),
    }
}

async fn handle_delete(State(state): State<McpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing Mcp-Session-Id header").into_response();
    };
    if state.sessions.close(id) {
        info!(session = %id, "http session closed");
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::NOT_FOUND, "unknown session").into_response()
    }
}
