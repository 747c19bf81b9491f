//! # omcp-axum
//!
//! Serve an [`omcp`] MCP server over HTTP with [axum](https://docs.rs/axum),
//! optionally behind OAuth 2.1 bearer tokens from [`omcp_auth`].
//!
//! ```rust,ignore
//! use omcp_auth::{AuthorizationServer, ResourceGuard, ScopeSet};
//! use omcp_axum::auth::{AuthLayer, BearerAuth, GuardValidator};
//! use omcp_axum::auth::oauth::{ResourceServerConfig, metadata_router};
//!
//! let protected = omcp_axum::mcp_router(server, SessionTable::new())
//!     .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(rs_config))
//!     .merge(metadata_router(auth.protected_resource_metadata("http://localhost:8004")));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8004").await?;
//! axum::serve(listener, protected).await?;
//! ```

pub use axum;

pub mod auth;
pub mod authorization;
pub mod mcp;

pub use authorization::authorization_router;
pub use mcp::{MCP_PATH, MCP_SESSION_ID_HEADER, mcp_router};
