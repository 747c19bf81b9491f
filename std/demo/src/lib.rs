//! Example MCP servers for exercising clients and discovery tooling.
//!
//! One tool catalog served under three authentication postures:
//! - [`Posture::None`]: `add`, `multiply`, `get_server_info`
//! - [`Posture::Bearer`]: adds `get_weather`, behind a static bearer token
//! - [`Posture::OAuth`]: adds `get_protected_data`, behind tokens issued by
//!   an OAuth 2.1 authorization server running alongside

use axum::Router;
use chrono::Utc;
use omcp::protocol::Implementation;
use omcp::{McpServer, ServerConfig, SessionTable, Tool, ToolRegistry};
use omcp_auth::metadata::{PROTECTED_RESOURCE_PATH, endpoint};
use omcp_auth::{
    AuthorizationServer, AuthorizationServerConfig, ClientRegistry, ResourceGuard, ScopeSet,
    TokenStore,
};
use omcp_axum::auth::oauth::{ResourceServerConfig, metadata_router};
use omcp_axum::auth::{AuthLayer, BearerAuth, GuardValidator};
use omcp_axum::{MCP_SESSION_ID_HEADER, authorization_router, mcp_router};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Token accepted by the bearer posture unless overridden.
pub const DEFAULT_BEARER_TOKEN: &str = "test-bearer-token-12345";
/// Client the static bearer token belongs to.
pub const BEARER_CLIENT_ID: &str = "mcp-test-client";
/// Pre-issued token accepted by the OAuth posture.
pub const OAUTH_TEST_TOKEN: &str = "oauth-test-token";

const PROTOCOLS: &[&str] = &["2024-11-05"];

/// Authentication posture of a demo server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Posture {
    None,
    Bearer,
    #[value(name = "oauth")]
    OAuth,
}

impl Posture {
    pub fn default_port(self) -> u16 {
        match self {
            Posture::None => 8002,
            Posture::Bearer => 8001,
            Posture::OAuth => 8004,
        }
    }

    fn server_name(self) -> &'static str {
        match self {
            Posture::None => "MCP Example Server (No Auth)",
            Posture::Bearer => "MCP Server (Bearer Auth)",
            Posture::OAuth => "MCP OAuth Protected Server",
        }
    }
}

/// Parameters for `add` and `multiply`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct OperandsParams {
    /// First operand.
    pub a: i64,
    /// Second operand.
    pub b: i64,
}

/// Parameters for `get_weather`.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WeatherParams {
    /// City name.
    pub city: String,
}

/// Tools that take no arguments.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoParams {}

/// Result of `get_server_info`.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub auth_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_metadata: Option<String>,
    pub supported_protocols: Vec<String>,
}

/// Result of `get_weather`.
#[derive(Debug, Serialize)]
pub struct Weather {
    pub city: String,
    pub temperature: i32,
    pub condition: String,
}

/// Result of `get_protected_data`.
#[derive(Debug, Serialize)]
pub struct ProtectedData {
    pub secret: String,
    pub timestamp: i64,
    pub access_level: String,
}

/// What a demo server advertises about itself.
#[derive(Debug, Clone)]
pub struct Demo {
    posture: Posture,
    token: Option<String>,
    oauth_metadata: Option<String>,
}

impl Demo {
    pub fn new(posture: Posture) -> Self {
        Self {
            posture,
            token: None,
            oauth_metadata: None,
        }
    }

    /// The static token this server accepts, reported by `get_server_info`.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Where clients discover the authorization server.
    pub fn with_oauth_metadata(mut self, url: impl Into<String>) -> Self {
        self.oauth_metadata = Some(url.into());
        self
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn info(&self) -> ServerInfo {
        let (description, auth_method) = match self.posture {
            Posture::None => ("Test server without authentication", None),
            Posture::Bearer => (
                "Test server with Bearer token authentication",
                Some("Bearer token"),
            ),
            Posture::OAuth => (
                "Test server with OAuth 2.1 authentication",
                Some("OAuth 2.1"),
            ),
        };
        ServerInfo {
            name: self.posture.server_name().into(),
            version: "1.0.0".into(),
            description: description.into(),
            auth_required: self.posture != Posture::None,
            auth_method: auth_method.map(Into::into),
            expected_token: self.token.clone(),
            oauth_metadata: self.oauth_metadata.clone(),
            supported_protocols: PROTOCOLS.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// The tool catalog for this posture.
    pub fn tools(&self) -> ToolRegistry {
        let info = self.info();
        let mut tools = ToolRegistry::new()
            .with(Tool::new("add", "Add two numbers", |p: OperandsParams| async move {
                tracing::debug!(a = p.a, b = p.b, "add");
                p.a.checked_add(p.b).ok_or("integer overflow")
            }))
            .with(Tool::new(
                "multiply",
                "Multiply two numbers",
                |p: OperandsParams| async move {
                    tracing::debug!(a = p.a, b = p.b, "multiply");
                    p.a.checked_mul(p.b).ok_or("integer overflow")
                },
            ))
            .with(Tool::new(
                "get_server_info",
                "Get server information",
                move |_: NoParams| {
                    let info = info.clone();
                    async move { Ok::<_, String>(info) }
                },
            ));

        if self.posture != Posture::None {
            tools.register(Tool::new(
                "get_weather",
                "Get weather information for a city (requires auth)",
                |p: WeatherParams| async move {
                    Ok::<_, String>(Weather {
                        city: p.city,
                        temperature: 22,
                        condition: "sunny".into(),
                    })
                },
            ));
        }
        if self.posture == Posture::OAuth {
            tools.register(Tool::new(
                "get_protected_data",
                "Get protected data (requires OAuth)",
                |_: NoParams| async move {
                    Ok::<_, String>(ProtectedData {
                        secret: "This data is protected by OAuth 2.1".into(),
                        timestamp: Utc::now().timestamp(),
                        access_level: "authenticated".into(),
                    })
                },
            ));
        }
        tools
    }

    pub fn server(&self) -> McpServer {
        let config = ServerConfig {
            server_info: Implementation::new(self.posture.server_name(), "1.0.0"),
            ..ServerConfig::default()
        };
        McpServer::new(config, self.tools())
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([http::HeaderName::from_static(MCP_SESSION_ID_HEADER)])
}

fn finish(router: Router) -> Router {
    router.layer(TraceLayer::new_for_http()).layer(cors())
}

/// Unauthenticated MCP endpoint.
pub fn open_app() -> Router {
    finish(mcp_router(Demo::new(Posture::None).server(), SessionTable::new()))
}

/// MCP endpoint accepting one static bearer token with scopes `read write`.
/// Requests must carry at least `read`.
pub fn bearer_app(token: &str) -> Router {
    let store = TokenStore::new();
    let issuer = AuthorizationServer::new(
        AuthorizationServerConfig::default(),
        ClientRegistry::new(),
        store.clone(),
    );
    issuer.seed_token(token, BEARER_CLIENT_ID, ScopeSet::parse("read write"));

    let validator = GuardValidator::new(ResourceGuard::new(store), ScopeSet::parse("read"));
    let demo = Demo::new(Posture::Bearer).with_token(token);
    finish(
        mcp_router(demo.server(), SessionTable::new())
            .layer(AuthLayer::new(BearerAuth::new(validator))),
    )
}

/// Addresses of the two OAuth posture listeners.
#[derive(Debug, Clone)]
pub struct OAuthUrls {
    /// Base URL of the authorization server, used as the issuer.
    pub issuer: String,
    /// Base URL of the protected MCP server, used as the resource identifier.
    pub resource: String,
}

/// The OAuth posture: an authorization server app and a protected MCP app
/// sharing one token store. Both serve the protected resource metadata.
pub fn oauth_apps(urls: &OAuthUrls) -> (Router, Router) {
    let store = TokenStore::new();
    let config = AuthorizationServerConfig {
        issuer: urls.issuer.clone(),
        ..AuthorizationServerConfig::default()
    };
    let server = AuthorizationServer::new(config, ClientRegistry::with_test_client(), store.clone());
    server.seed_token(
        OAUTH_TEST_TOKEN,
        omcp_auth::client::TEST_CLIENT_ID,
        ScopeSet::parse("read write mcp:tools"),
    );

    let resource_metadata = server.protected_resource_metadata(urls.resource.clone());
    let auth_app =
        authorization_router(server.clone()).merge(metadata_router(resource_metadata.clone()));

    let rs_config = ResourceServerConfig {
        resource_metadata_url: endpoint(&urls.resource, PROTECTED_RESOURCE_PATH),
        default_scope: Some(server.config().default_scope.to_string()),
    };
    let validator = GuardValidator::new(ResourceGuard::new(store), ScopeSet::parse("read"));
    let demo = Demo::new(Posture::OAuth)
        .with_token(OAUTH_TEST_TOKEN)
        .with_oauth_metadata(endpoint(&urls.issuer, PROTECTED_RESOURCE_PATH));
    let mcp_app = mcp_router(demo.server(), SessionTable::new())
        .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(rs_config))
        .merge(metadata_router(resource_metadata));

    (finish(auth_app), finish(mcp_app))
}

#[cfg(test)]
mod tests {
    use crate::{Demo, OAUTH_TEST_TOKEN, OAuthUrls, Posture, bearer_app, oauth_apps, open_app};
    use axum::body::Body;
    use http::{Request, StatusCode, header};
    use serde_json::{Map, Value, json};
    use tower::ServiceExt;

    fn names(demo: &Demo) -> Vec<String> {
        demo.tools().list().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn catalog_grows_with_posture() {
        assert_eq!(
            names(&Demo::new(Posture::None)),
            vec!["add", "multiply", "get_server_info"]
        );
        assert_eq!(
            names(&Demo::new(Posture::Bearer)),
            vec!["add", "multiply", "get_server_info", "get_weather"]
        );
        assert_eq!(
            names(&Demo::new(Posture::OAuth)),
            vec![
                "add",
                "multiply",
                "get_server_info",
                "get_weather",
                "get_protected_data"
            ]
        );
    }

    #[test]
    fn default_ports() {
        assert_eq!(Posture::None.default_port(), 8002);
        assert_eq!(Posture::Bearer.default_port(), 8001);
        assert_eq!(Posture::OAuth.default_port(), 8004);
    }

    #[tokio::test]
    async fn arithmetic_tools() {
        let tools = Demo::new(Posture::None).tools();
        let args = json!({"a": 5, "b": 3}).as_object().cloned().unwrap();

        let sum = tools.get("add").unwrap().call(args.clone()).await.unwrap();
        assert_eq!(serde_json::to_value(&sum.content).unwrap()[0]["text"], "8");

        let product = tools.get("multiply").unwrap().call(args).await.unwrap();
        assert_eq!(serde_json::to_value(&product.content).unwrap()[0]["text"], "15");
    }

    #[tokio::test]
    async fn overflow_is_a_tool_error() {
        let tools = Demo::new(Posture::None).tools();
        let args = json!({"a": i64::MAX, "b": 2}).as_object().cloned().unwrap();
        let result = tools.get("multiply").unwrap().call(args).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn server_info_reports_posture() {
        let demo = Demo::new(Posture::Bearer).with_token("t0k");
        let result = demo
            .tools()
            .get("get_server_info")
            .unwrap()
            .call(Map::new())
            .await
            .unwrap();
        let info = result.structured_content.unwrap();
        assert_eq!(info["name"], "MCP Server (Bearer Auth)");
        assert_eq!(info["auth_required"], true);
        assert_eq!(info["expected_token"], "t0k");
        assert_eq!(info["supported_protocols"], json!(["2024-11-05"]));

        let open = Demo::new(Posture::None).info();
        assert!(!open.auth_required);
        assert!(open.auth_method.is_none());
    }

    fn initialize(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "1.0"}
            }
        });
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: http::Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn open_app_needs_no_token() {
        let response = open_app().oneshot(initialize(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["result"]["serverInfo"]["name"],
            "MCP Example Server (No Auth)"
        );
    }

    #[tokio::test]
    async fn bearer_app_checks_the_static_token() {
        let app = bearer_app("secret-token");

        let response = app.clone().oneshot(initialize(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());

        let response = app.clone().oneshot(initialize(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(initialize(Some("secret-token"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    fn urls() -> OAuthUrls {
        OAuthUrls {
            issuer: "http://localhost:8003".into(),
            resource: "http://localhost:8004".into(),
        }
    }

    #[test]
    fn oauth_apps_build_without_route_conflicts() {
        let (auth_app, mcp_app) = oauth_apps(&urls());
        drop((auth_app, mcp_app));
    }

    #[tokio::test]
    async fn oauth_apps_share_discovery_metadata() {
        let (auth_app, mcp_app) = oauth_apps(&urls());
        for app in [auth_app.clone(), mcp_app.clone()] {
            let response = app
                .oneshot(
                    Request::get("/.well-known/oauth-protected-resource")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let metadata = body_json(response).await;
            assert_eq!(metadata["resource"], "http://localhost:8004");
            assert_eq!(metadata["authorization_servers"][0], "http://localhost:8003");
        }

        let response = auth_app
            .oneshot(
                Request::get("/.well-known/oauth-authorization-server")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let metadata = body_json(response).await;
        assert_eq!(
            metadata["token_endpoint"],
            "http://localhost:8003/oauth/token"
        );
        let scopes = metadata["scopes_supported"].as_array().unwrap();
        assert!(scopes.iter().any(|scope| scope == "mcp:tools"));
    }

    #[tokio::test]
    async fn oauth_mcp_app_challenges_and_accepts_seeded_token() {
        let (_, mcp_app) = oauth_apps(&urls());

        let response = mcp_app.clone().oneshot(initialize(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.contains(
            "resource_metadata=\"http://localhost:8004/.well-known/oauth-protected-resource\""
        ));

        let response = mcp_app
            .oneshot(initialize(Some(OAUTH_TEST_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
