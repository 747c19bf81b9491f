use omcp::{McpServer, ServerConfig, SessionTable, Tool, ToolRegistry};
use omcp_auth::{
    AuthorizationServer, AuthorizationServerConfig, ClientRegistry, ResourceGuard, ScopeSet,
    TokenStore,
};
use omcp_axum::auth::oauth::{ResourceServerConfig, metadata_router};
use omcp_axum::auth::{AuthLayer, BearerAuth, GuardValidator};
use omcp_axum::axum::Router;
use omcp_axum::{authorization_router, mcp_router};
use omcp_cli::Error;
use omcp_cli::client::{HttpClient, Inspect};
use omcp_cli::cmd::oauth::{self, OAuthArgs};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Map, json};
use tokio::net::TcpListener;

#[derive(Deserialize, JsonSchema)]
struct AddParams {
    a: i64,
    b: i64,
}

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        omcp_axum::axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Authorization server and protected MCP server on two ephemeral ports.
async fn servers() -> (String, String) {
    let auth_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let issuer = format!("http://{}", auth_listener.local_addr().unwrap());

    let store = TokenStore::new();
    let auth = AuthorizationServer::new(
        AuthorizationServerConfig {
            issuer: issuer.clone(),
            ..AuthorizationServerConfig::default()
        },
        ClientRegistry::with_test_client(),
        store.clone(),
    );
    let auth_router = authorization_router(auth.clone());
    tokio::spawn(async move {
        omcp_axum::axum::serve(auth_listener, auth_router).await.unwrap();
    });

    let tools = ToolRegistry::new().with(Tool::new("add", "Add two numbers", |p: AddParams| async move {
        Ok::<_, String>(p.a + p.b)
    }));
    let validator = GuardValidator::new(ResourceGuard::new(store), ScopeSet::parse("read"));
    let rs_config = ResourceServerConfig {
        resource_metadata_url: "http://127.0.0.1/.well-known/oauth-protected-resource".into(),
        default_scope: Some("read".into()),
    };
    let mcp = mcp_router(McpServer::new(ServerConfig::default(), tools), SessionTable::new())
        .layer(AuthLayer::new(BearerAuth::new(validator)).with_resource_server(rs_config))
        .merge(metadata_router(auth.protected_resource_metadata("http://127.0.0.1")));
    let base = spawn(mcp).await;
    (issuer, format!("{base}/mcp"))
}

fn oauth_args(issuer: &str) -> OAuthArgs {
    OAuthArgs {
        issuer: issuer.into(),
        client_id: "mcp-oauth-test-client".into(),
        client_secret: "mcp-oauth-test-secret".into(),
        scope: "read".into(),
        redirect_uri: "http://localhost:8080/callback".into(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn oauth_token_opens_a_session() {
    let (issuer, mcp_url) = servers().await;

    let token = oauth::run(&oauth_args(&issuer)).await.unwrap();
    assert_eq!(token.token_type, "Bearer");
    assert_eq!(token.scope.to_string(), "read");

    let mut client = HttpClient::new(mcp_url, Some(token.access_token));
    let info = client.initialize().await.unwrap();
    assert_eq!(info["serverInfo"]["name"], "omcp");
    assert!(client.session_id().is_some());

    let tools = client.list_tools().await.unwrap();
    assert_eq!(tools.len(), 1);

    let mut arguments = Map::new();
    arguments.insert("a".into(), json!(2));
    arguments.insert("b".into(), json!(40));
    let result = client.call_tool("add", arguments).await.unwrap();
    assert!(!result.is_error);
    assert_eq!(serde_json::to_value(&result.content).unwrap()[0]["text"], "42");

    client.close().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_token_surfaces_the_challenge() {
    let (_, mcp_url) = servers().await;
    let mut client = HttpClient::new(mcp_url, None);
    match client.initialize().await {
        Err(Error::Unauthorized { status, challenge }) => {
            assert_eq!(status, 401);
            assert!(challenge.contains("resource_metadata="));
        }
        other => panic!("expected 401, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_secret_fails_the_exchange() {
    let (issuer, _) = servers().await;
    let args = OAuthArgs {
        client_secret: "wrong".into(),
        ..oauth_args(&issuer)
    };
    match oauth::run(&args).await {
        Err(Error::Status { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid_client"));
        }
        other => panic!("expected invalid_client, got {other:?}"),
    }
}
