//! OAuth 2.1 authorization server: the authorization-code grant only.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{Client, ClientRegistry};
use crate::error::AuthError;
use crate::metadata::{
    AUTHORIZE_PATH, AuthorizationServerMetadata, ProtectedResourceMetadata, TOKEN_PATH, endpoint,
};
use crate::scope::ScopeSet;
use crate::store::{AccessToken, AuthorizationCode, TokenStore};

pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
pub const RESPONSE_TYPE_CODE: &str = "code";
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct AuthorizationServerConfig {
    /// Issuer URL; endpoint URLs in the metadata document are derived from it.
    pub issuer: String,
    /// Lifetime of an authorization code.
    pub code_ttl: Duration,
    /// Lifetime of an access token. `None` issues tokens that never expire.
    pub token_ttl: Option<Duration>,
    pub scopes_supported: ScopeSet,
    /// Scope granted when an authorize request names none.
    pub default_scope: ScopeSet,
}

impl Default for AuthorizationServerConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8003".into(),
            code_ttl: Duration::seconds(60),
            token_ttl: Some(Duration::seconds(3600)),
            scopes_supported: ScopeSet::parse("read write mcp:tools"),
            default_scope: ScopeSet::parse("read"),
        }
    }
}

/// Query parameters of `GET /oauth/authorize`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub response_type: Option<String>,
    pub client_id: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Form body of `POST /oauth/token`.
///
/// Client credentials may also arrive in an `Authorization: Basic` header;
/// the HTTP layer resolves them before calling [`AuthorizationServer::exchange`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    pub scope: ScopeSet,
}

/// Outcome of the consent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    Approved,
    Denied,
}

/// Decides whether a resource owner approves a client's scope request.
pub trait ConsentPolicy: Send + Sync + 'static {
    fn decide(&self, client: &Client, scope: &ScopeSet) -> Consent;
}

/// Approves every request. Suitable for test harnesses only: no user is
/// ever asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ConsentPolicy for AutoApprove {
    fn decide(&self, _client: &Client, _scope: &ScopeSet) -> Consent {
        Consent::Approved
    }
}

#[derive(Clone)]
pub struct AuthorizationServer {
    config: Arc<AuthorizationServerConfig>,
    clients: Arc<ClientRegistry>,
    store: TokenStore,
    consent: Arc<dyn ConsentPolicy>,
}

impl std::fmt::Debug for AuthorizationServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationServer")
            .field("config", &self.config)
            .field("clients", &self.clients)
            .finish_non_exhaustive()
    }
}

impl AuthorizationServer {
    pub fn new(config: AuthorizationServerConfig, clients: ClientRegistry, store: TokenStore) -> Self {
        Self {
            config: Arc::new(config),
            clients: Arc::new(clients),
            store,
            consent: Arc::new(AutoApprove),
        }
    }

    pub fn with_consent(mut self, consent: impl ConsentPolicy) -> Self {
        self.consent = Arc::new(consent);
        self
    }

    pub fn config(&self) -> &AuthorizationServerConfig {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Handle an authorize request and return the redirect target
    /// `redirect_uri?code=<code>&state=<state>`.
    pub fn authorize(&self, request: &AuthorizeRequest) -> Result<Url, AuthError> {
        if let Some(response_type) = request.response_type.as_deref()
            && response_type != RESPONSE_TYPE_CODE
        {
            return Err(AuthError::InvalidRequest(format!(
                "unsupported response_type: {response_type}"
            )));
        }

        let client = self.clients.require(&request.client_id)?;
        let mut redirect = Url::parse(&request.redirect_uri)
            .map_err(|e| AuthError::InvalidRequest(format!("invalid redirect_uri: {e}")))?;

        let requested = request
            .scope
            .as_deref()
            .map(ScopeSet::parse)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.config.default_scope.clone());
        let scope = requested.intersection(&self.config.scopes_supported);
        if scope.is_empty() {
            return Err(AuthError::InvalidScope(format!(
                "none of the requested scopes are supported: {requested}"
            )));
        }

        if self.consent.decide(client, &scope) == Consent::Denied {
            warn!(client_id = %client.client_id, %scope, "consent denied");
            return Err(AuthError::AccessDenied("resource owner denied the request".into()));
        }

        let now = Utc::now();
        let purged = self.store.purge_expired_codes(self.config.code_ttl, now);
        if purged > 0 {
            debug!(purged, "dropped expired authorization codes");
        }

        let state = request.state.clone().unwrap_or_default();
        let code = uuid::Uuid::new_v4().simple().to_string();
        self.store.put_code(AuthorizationCode {
            code: code.clone(),
            client_id: client.client_id.clone(),
            redirect_uri: request.redirect_uri.clone(),
            scope: scope.clone(),
            state: state.clone(),
            issued_at: now,
        });
        info!(client_id = %client.client_id, %scope, "issued authorization code");

        redirect
            .query_pairs_mut()
            .append_pair("code", &code)
            .append_pair("state", &state);
        Ok(redirect)
    }

    /// Exchange an authorization code for an access token.
    pub fn exchange(
        &self,
        client_id: &str,
        client_secret: &str,
        request: &TokenRequest,
    ) -> Result<TokenResponse, AuthError> {
        let client = self.clients.authenticate(client_id, client_secret)?;

        if request.grant_type != GRANT_TYPE_AUTHORIZATION_CODE {
            return Err(AuthError::InvalidGrant(format!(
                "unsupported grant_type: {}",
                request.grant_type
            )));
        }
        let code = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::InvalidRequest("missing code".into()))?;

        // Taken before any further check: a presented code is spent either way.
        let record = self
            .store
            .take_code(code)
            .ok_or_else(|| AuthError::InvalidGrant("unknown or already used code".into()))?;

        if record.client_id != client.client_id {
            warn!(client_id = %client.client_id, "code presented by a different client");
            return Err(AuthError::InvalidGrant("code was issued to another client".into()));
        }
        let now = Utc::now();
        if record.is_expired(self.config.code_ttl, now) {
            return Err(AuthError::InvalidGrant("code expired".into()));
        }
        if let Some(redirect_uri) = request.redirect_uri.as_deref()
            && redirect_uri != record.redirect_uri
        {
            return Err(AuthError::InvalidGrant("redirect_uri mismatch".into()));
        }

        let purged = self.store.purge_expired_tokens(now);
        if purged > 0 {
            debug!(purged, "dropped expired access tokens");
        }
        let token = AccessToken {
            token: uuid::Uuid::new_v4().to_string(),
            client_id: client.client_id.clone(),
            scope: record.scope,
            expires_at: self.config.token_ttl.map(|ttl| now + ttl),
        };
        info!(
            client_id = %token.client_id,
            scope = %token.scope,
            token = %redact(&token.token),
            "exchanged code for access token"
        );
        let response = TokenResponse {
            access_token: token.token.clone(),
            token_type: TOKEN_TYPE_BEARER.into(),
            expires_in: self.config.token_ttl.map(|ttl| ttl.num_seconds()),
            scope: token.scope.clone(),
        };
        self.store.put_token(token);
        Ok(response)
    }

    /// Store a fixed, never-expiring token, as used by the static bearer
    /// posture and test fixtures.
    pub fn seed_token(&self, token: impl Into<String>, client_id: impl Into<String>, scope: ScopeSet) {
        let token = AccessToken {
            token: token.into(),
            client_id: client_id.into(),
            scope,
            expires_at: None,
        };
        debug!(client_id = %token.client_id, token = %redact(&token.token), "seeded static token");
        self.store.put_token(token);
    }

    pub fn authorization_server_metadata(&self) -> AuthorizationServerMetadata {
        let issuer = &self.config.issuer;
        AuthorizationServerMetadata {
            issuer: issuer.clone(),
            authorization_endpoint: endpoint(issuer, AUTHORIZE_PATH),
            token_endpoint: endpoint(issuer, TOKEN_PATH),
            response_types_supported: vec![RESPONSE_TYPE_CODE.into()],
            grant_types_supported: vec![GRANT_TYPE_AUTHORIZATION_CODE.into()],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".into(),
                "client_secret_post".into(),
            ],
            scopes_supported: Some(self.config.scopes_supported.to_vec()),
        }
    }

    /// Metadata for a resource server that trusts this issuer.
    pub fn protected_resource_metadata(&self, resource: impl Into<String>) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: resource.into(),
            authorization_servers: vec![self.config.issuer.clone()],
            scopes_supported: Some(self.config.scopes_supported.to_vec()),
            bearer_methods_supported: Some(vec!["header".into()]),
            resource_documentation: None,
        }
    }
}

/// Shorten a secret for logging.
pub(crate) fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(6).collect();
    format!("{prefix}...")
}
