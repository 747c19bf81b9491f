use omcp::{JsonRpcError, TransportError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Rpc(#[from] JsonRpcError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid argument, expected KEY=VALUE: {0}")]
    InvalidArg(String),

    #[error("no target given")]
    MissingTarget,

    /// 401 or 403 from a protected endpoint; `challenge` is the
    /// `WWW-Authenticate` header, empty if absent.
    #[error("server rejected credentials with HTTP {status}: {challenge}")]
    Unauthorized { status: u16, challenge: String },

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("server sent no response to {0}")]
    NoResponse(String),

    #[error("OAuth flow failed: {0}")]
    OAuth(String),
}
