//! Authentication middleware for MCP servers.
//!
//! Provides a tower middleware that validates incoming requests using an
//! [`Authenticator`]. On success, the authenticated claims are inserted into
//! the request extensions, where handlers can pick them up with
//! `Extension<Grant>`.
//!
//! When configured with a [`ResourceServerConfig`](oauth::ResourceServerConfig),
//! the middleware emits `WWW-Authenticate` challenges: 401 for missing,
//! unknown or expired tokens and 403 for insufficient scope.
//!
//! # Example
//!
//! ```rust,ignore
//! use omcp_auth::{ResourceGuard, ScopeSet, TokenStore};
//! use omcp_axum::auth::{AuthLayer, BearerAuth, GuardValidator};
//! use omcp_axum::auth::oauth::ResourceServerConfig;
//!
//! let rs_config = ResourceServerConfig {
//!     resource_metadata_url:
//!         "http://localhost:8004/.well-known/oauth-protected-resource".into(),
//!     default_scope: Some("read".into()),
//! };
//! let validator = GuardValidator::new(ResourceGuard::new(store), ScopeSet::parse("read"));
//!
//! let app = omcp_axum::mcp_router(server, SessionTable::new())
//!     .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(rs_config));
//! ```

mod bearer;

pub mod oauth;

pub use bearer::{BearerAuth, GuardValidator, bearer_token};

use futures::future::BoxFuture;
use http::{Request, Response};
use oauth::{ResourceServerConfig, challenge_response};
use omcp_auth::AuthFailure;
use std::sync::Arc;
use std::task::{Context, Poll};

/// Trait for validating incoming MCP requests.
///
/// On success, `Claims` is inserted into `http::Extensions`.
pub trait Authenticator: Clone + Send + Sync + 'static {
    /// The claims type produced on successful authentication.
    type Claims: Clone + Send + Sync + 'static;

    fn authenticate(
        &self,
        parts: &http::request::Parts,
    ) -> impl Future<Output = Result<Self::Claims, AuthFailure>> + Send;
}

/// Trait for validating a credential string (e.g., a Bearer token).
///
/// Wrap an implementation in [`BearerAuth`], which handles extraction from
/// the `Authorization` header.
pub trait Validator: Clone + Send + Sync + 'static {
    type Claims: Clone + Send + Sync + 'static;

    fn validate(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<Self::Claims, AuthFailure>> + Send;
}

/// Settings shared by every [`AuthService`] a layer produces.
struct Gate<A> {
    authenticator: A,
    challenge: Option<ResourceServerConfig>,
}

impl<A> Gate<A> {
    fn reject(&self, parts: &http::request::Parts, failure: AuthFailure) -> Response<axum::body::Body> {
        tracing::info!(
            method = %parts.method,
            path = %parts.uri.path(),
            reason = %failure,
            "rejected request"
        );
        challenge_response(self.challenge.as_ref(), &failure)
    }
}

/// Tower [`Layer`](tower::Layer) that applies [`AuthService`].
pub struct AuthLayer<A> {
    gate: Arc<Gate<A>>,
}

impl<A> Clone for AuthLayer<A> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

impl<A: Clone> AuthLayer<A> {
    pub fn new(authenticator: A) -> Self {
        Self {
            gate: Arc::new(Gate {
                authenticator,
                challenge: None,
            }),
        }
    }

    /// Include `resource_metadata` challenges in rejections.
    pub fn with_resource_server(self, config: ResourceServerConfig) -> Self {
        Self {
            gate: Arc::new(Gate {
                authenticator: self.gate.authenticator.clone(),
                challenge: Some(config),
            }),
        }
    }
}

impl<A, S> tower::Layer<S> for AuthLayer<A> {
    type Service = AuthService<A, S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            gate: self.gate.clone(),
            inner,
        }
    }
}

/// Tower service that authenticates requests before forwarding them.
pub struct AuthService<A, S> {
    gate: Arc<Gate<A>>,
    inner: S,
}

impl<A, S: Clone> Clone for AuthService<A, S> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<A, S, B> tower::Service<Request<B>> for AuthService<A, S>
where
    A: Authenticator,
    S: tower::Service<Request<B>, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let gate = self.gate.clone();
        // The clone has not been polled; keep the ready one for this call.
        let fresh = self.inner.clone();
        let ready = std::mem::replace(&mut self.inner, fresh);

        Box::pin(async move {
            let (parts, body) = req.into_parts();
            let claims = match gate.authenticator.authenticate(&parts).await {
                Ok(claims) => claims,
                Err(failure) => return Ok(gate.reject(&parts, failure)),
            };
            let mut req = Request::from_parts(parts, body);
            req.extensions_mut().insert(claims);
            let mut inner = ready;
            inner.call(req).await
        })
    }
}
