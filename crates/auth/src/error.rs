use thiserror::Error;

use crate::scope::ScopeSet;

/// Authorization-server failures (RFC 6749 §4.1.2.1 and §5.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid client: {0}")]
    InvalidClient(String),

    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("access denied: {0}")]
    AccessDenied(String),
}

impl AuthError {
    /// The `error` code for an OAuth error response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidClient(_) => "invalid_client",
            AuthError::InvalidGrant(_) => "invalid_grant",
            AuthError::InvalidRequest(_) => "invalid_request",
            AuthError::InvalidScope(_) => "invalid_scope",
            AuthError::AccessDenied(_) => "access_denied",
        }
    }

    /// Human-readable `error_description`.
    pub fn description(&self) -> &str {
        match self {
            AuthError::InvalidClient(msg)
            | AuthError::InvalidGrant(msg)
            | AuthError::InvalidRequest(msg)
            | AuthError::InvalidScope(msg)
            | AuthError::AccessDenied(msg) => msg,
        }
    }
}

/// Why a bearer token did not admit a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("missing bearer token")]
    Unauthenticated,

    #[error("unknown access token")]
    InvalidToken,

    #[error("access token expired")]
    TokenExpired,

    #[error("insufficient scope: requires {required}")]
    InsufficientScope { required: ScopeSet, granted: ScopeSet },
}

impl AuthFailure {
    /// The RFC 6750 `error` attribute, if the challenge carries one.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            AuthFailure::Unauthenticated => None,
            AuthFailure::InvalidToken | AuthFailure::TokenExpired => Some("invalid_token"),
            AuthFailure::InsufficientScope { .. } => Some("insufficient_scope"),
        }
    }
}
