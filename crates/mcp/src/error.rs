use serde_json::json;
use thiserror::Error;

use crate::jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JsonRpcError, METHOD_NOT_FOUND,
    SESSION_CLOSED,
};

/// Protocol-level failures, reported to the caller as JSON-RPC error objects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("unsupported protocol version: {requested}")]
    UnsupportedProtocolVersion {
        requested: String,
        supported: Vec<String>,
    },

    #[error("session not initialized")]
    NotInitialized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("session closed")]
    SessionClosed,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    /// JSON-RPC error code for this failure.
    pub fn code(&self) -> i64 {
        match self {
            ProtocolError::NotInitialized | ProtocolError::InvalidRequest(_) => INVALID_REQUEST,
            ProtocolError::MethodNotFound(_) => METHOD_NOT_FOUND,
            ProtocolError::UnsupportedProtocolVersion { .. }
            | ProtocolError::ToolNotFound(_)
            | ProtocolError::InvalidParams(_) => INVALID_PARAMS,
            ProtocolError::SessionClosed => SESSION_CLOSED,
            ProtocolError::Internal(_) => INTERNAL_ERROR,
        }
    }

    /// Render as a JSON-RPC error object.
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        let error = JsonRpcError::new(self.code(), self.to_string());
        match self {
            ProtocolError::UnsupportedProtocolVersion {
                requested,
                supported,
            } => error.with_data(json!({ "requested": requested, "supported": supported })),
            ProtocolError::ToolNotFound(name) => error.with_data(json!({ "tool": name })),
            _ => error,
        }
    }
}

impl From<ProtocolError> for JsonRpcError {
    fn from(err: ProtocolError) -> Self {
        err.to_jsonrpc()
    }
}

/// Failures of the framing layer or of a remote peer.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("peer closed the connection")]
    Closed,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Rpc(#[from] JsonRpcError),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::MalformedMessage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ProtocolError;
    use crate::jsonrpc::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, SESSION_CLOSED};

    #[test]
    fn codes_distinguish_conditions() {
        assert_eq!(ProtocolError::NotInitialized.code(), INVALID_REQUEST);
        assert_eq!(
            ProtocolError::MethodNotFound("x".into()).code(),
            METHOD_NOT_FOUND
        );
        assert_eq!(ProtocolError::ToolNotFound("x".into()).code(), INVALID_PARAMS);
        assert_eq!(ProtocolError::SessionClosed.code(), SESSION_CLOSED);
    }

    #[test]
    fn unsupported_version_carries_supported_list() {
        let err = ProtocolError::UnsupportedProtocolVersion {
            requested: "1999-01-01".into(),
            supported: vec!["2025-06-18".into()],
        }
        .to_jsonrpc();
        let data = err.data.unwrap();
        assert_eq!(data["requested"], "1999-01-01");
        assert_eq!(data["supported"][0], "2025-06-18");
    }
}
