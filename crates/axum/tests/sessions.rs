use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode, header};
use omcp::{McpServer, ServerConfig, SessionTable, ToolRegistry};
use omcp_axum::{MCP_SESSION_ID_HEADER, mcp_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (Router, SessionTable) {
    let sessions = SessionTable::new();
    let router = mcp_router(
        McpServer::new(ServerConfig::default(), ToolRegistry::new()),
        sessions.clone(),
    );
    (router, sessions)
}

fn post(session: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header(MCP_SESSION_ID_HEADER, session);
    }
    builder.body(body.into()).unwrap()
}

async fn body_json(response: http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn initialize(app: &Router) -> String {
    let body = json!({
        "jsonrpc": "2.0", "id": 0, "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "session-test", "version": "1.0"}
        }
    });
    let response = app
        .clone()
        .oneshot(post(None, body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    response.headers()[MCP_SESSION_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn initialize_assigns_a_session() {
    let (app, sessions) = app();
    let first = initialize(&app).await;
    let second = initialize(&app).await;
    assert_ne!(first, second);
    assert_eq!(sessions.open_count(), 2);

    let response = app
        .oneshot(post(
            Some(&first),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["result"]["tools"], json!([]));
}

#[tokio::test]
async fn missing_or_unknown_session_is_invalid_request() {
    let (app, _) = app();

    let missing = app
        .clone()
        .oneshot(post(None, json!({"jsonrpc": "2.0", "id": 9, "method": "tools/list"}).to_string()))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::OK);
    let body = body_json(missing).await;
    assert_eq!(body["id"], 9);
    assert_eq!(body["error"]["code"], -32600);

    let unknown = app
        .oneshot(post(
            Some("no-such-session"),
            json!({"jsonrpc": "2.0", "id": 10, "method": "tools/list"}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(body_json(unknown).await["error"]["code"], -32600);
}

#[tokio::test]
async fn failed_initialize_creates_no_session() {
    let (app, sessions) = app();
    let body = json!({
        "jsonrpc": "2.0", "id": 1, "method": "initialize",
        "params": {"protocolVersion": "1999-01-01", "capabilities": {},
                   "clientInfo": {"name": "old", "version": "0"}}
    });
    let response = app.oneshot(post(None, body.to_string())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!response.headers().contains_key(MCP_SESSION_ID_HEADER));
    assert_eq!(body_json(response).await["error"]["code"], -32602);
    assert_eq!(sessions.open_count(), 0);
}

#[tokio::test]
async fn delete_closes_the_session() {
    let (app, _) = app();
    let session = initialize(&app).await;

    let delete = |id: &str| {
        Request::delete("/mcp")
            .header(MCP_SESSION_ID_HEADER, id)
            .body(Body::empty())
            .unwrap()
    };
    let response = app.clone().oneshot(delete(&session)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(post(
            Some(&session),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["error"]["code"], -32000);

    let response = app.oneshot(delete("never-existed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn framing_failures() {
    let (app, _) = app();

    let garbage = app.clone().oneshot(post(None, "{not json")).await.unwrap();
    assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
    let body = body_json(garbage).await;
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);

    let get = app
        .clone()
        .oneshot(Request::get("/mcp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(get.status(), StatusCode::METHOD_NOT_ALLOWED);

    let session = initialize(&app).await;
    let notification = app
        .oneshot(post(
            Some(&session),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(notification.status(), StatusCode::ACCEPTED);
}
