//! OAuth 2.1 resource server support.
//!
//! - **Protected Resource Metadata** ([RFC 9728](https://datatracker.ietf.org/doc/html/rfc9728)):
//!   [`metadata_router`] serves `/.well-known/oauth-protected-resource` so MCP
//!   clients can discover the authorization server.
//! - **Challenges**: 401 and 403 responses with `WWW-Authenticate` headers per
//!   [RFC 6750](https://datatracker.ietf.org/doc/html/rfc6750).

mod error;
mod metadata;

pub use error::{ResourceServerConfig, challenge_response, www_authenticate_401, www_authenticate_403};
pub use metadata::{authorization_metadata_router, metadata_router};
