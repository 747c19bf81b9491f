//! OAuth 2.1 authorization for MCP servers.
//!
//! An [`AuthorizationServer`] issues single-use authorization codes and
//! exchanges them for opaque bearer tokens. A [`ResourceGuard`] checks those
//! tokens, and the scopes they carry, in front of the MCP endpoint. Both
//! share one [`TokenStore`]:
//!
//! ```rust,ignore
//! use omcp_auth::{AuthorizationServer, AuthorizationServerConfig, ClientRegistry, ResourceGuard, TokenStore};
//!
//! let store = TokenStore::new();
//! let server = AuthorizationServer::new(
//!     AuthorizationServerConfig::default(),
//!     ClientRegistry::with_test_client(),
//!     store.clone(),
//! );
//! let guard = ResourceGuard::new(store);
//! ```

pub mod client;
pub mod error;
pub mod guard;
pub mod metadata;
pub mod scope;
pub mod server;
pub mod store;

pub use client::{Client, ClientRegistry};
pub use error::{AuthError, AuthFailure};
pub use guard::{Grant, ResourceGuard};
pub use metadata::{AuthorizationServerMetadata, ProtectedResourceMetadata};
pub use scope::ScopeSet;
pub use server::{
    AuthorizationServer, AuthorizationServerConfig, AuthorizeRequest, AutoApprove, Consent,
    ConsentPolicy, TokenRequest, TokenResponse,
};
pub use store::{AccessToken, AuthorizationCode, TokenStore};
