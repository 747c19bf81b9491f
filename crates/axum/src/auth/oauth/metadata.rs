//! Routers serving the discovery documents at their well-known paths.
//!
//! ```rust,ignore
//! use omcp_axum::auth::oauth::metadata_router;
//!
//! let app = omcp_axum::mcp_router(server, sessions)
//!     .merge(metadata_router(auth.protected_resource_metadata("http://localhost:8004")));
//! ```

use axum::{Json, response::IntoResponse};
use omcp_auth::metadata::{AUTHORIZATION_SERVER_PATH, PROTECTED_RESOURCE_PATH};
use omcp_auth::{AuthorizationServerMetadata, ProtectedResourceMetadata};
use std::sync::Arc;

/// Serve Protected Resource Metadata at `/.well-known/oauth-protected-resource`.
pub fn metadata_router(metadata: ProtectedResourceMetadata) -> axum::Router {
    let metadata = Arc::new(metadata);
    axum::Router::new().route(
        PROTECTED_RESOURCE_PATH,
        axum::routing::get(move || {
            let metadata = metadata.clone();
            async move { Json(metadata.as_ref().clone()).into_response() }
        }),
    )
}

/// Serve Authorization Server Metadata at `/.well-known/oauth-authorization-server`.
pub fn authorization_metadata_router(metadata: AuthorizationServerMetadata) -> axum::Router {
    let metadata = Arc::new(metadata);
    axum::Router::new().route(
        AUTHORIZATION_SERVER_PATH,
        axum::routing::get(move || {
            let metadata = metadata.clone();
            async move { Json(metadata.as_ref().clone()).into_response() }
        }),
    )
}
