//! HTTP endpoints of the authorization server.
//!
//! | Method | Path | Success | Failure |
//! |---|---|---|---|
//! | GET | `/.well-known/oauth-authorization-server` | 200 metadata | |
//! | GET | `/oauth/authorize` | 302 to `redirect_uri?code=..&state=..` | 400 |
//! | POST | `/oauth/token` | 200 token response | 401 `invalid_client`, 400 otherwise |

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use omcp_auth::metadata::{AUTHORIZE_PATH, TOKEN_PATH};
use omcp_auth::{AuthError, AuthorizationServer, AuthorizeRequest, TokenRequest};
use serde_json::json;

use crate::auth::oauth::authorization_metadata_router;

/// Router for the authorize and token endpoints plus the server's
/// metadata document.
pub fn authorization_router(server: AuthorizationServer) -> Router {
    let metadata = server.authorization_server_metadata();
    Router::new()
        .route(AUTHORIZE_PATH, get(authorize))
        .route(TOKEN_PATH, post(token))
        .with_state(server)
        .merge(authorization_metadata_router(metadata))
}

async fn authorize(
    State(server): State<AuthorizationServer>,
    query: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Response {
    let Query(request) = match query {
        Ok(query) => query,
        Err(rejection) => {
            let err = AuthError::InvalidRequest(rejection.body_text());
            return error_body(StatusCode::BAD_REQUEST, &err);
        }
    };

    // Nothing is redirected on failure, so every error is a plain 400.
    match server.authorize(&request) {
        Ok(redirect) => match HeaderValue::from_str(redirect.as_str()) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(_) => error_body(
                StatusCode::BAD_REQUEST,
                &AuthError::InvalidRequest("redirect_uri is not a valid header value".into()),
            ),
        },
        Err(err) => {
            tracing::info!(client_id = %request.client_id, error = %err, "authorize rejected");
            error_body(StatusCode::BAD_REQUEST, &err)
        }
    }
}

async fn token(
    State(server): State<AuthorizationServer>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let Form(request) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return error_response(&AuthError::InvalidRequest(rejection.body_text()));
        }
    };

    let Some((client_id, client_secret)) = client_credentials(&headers, &request) else {
        return error_response(&AuthError::InvalidClient("missing client credentials".into()));
    };

    match server.exchange(&client_id, &client_secret, &request) {
        Ok(token) => (
            StatusCode::OK,
            [
                (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                (header::PRAGMA, HeaderValue::from_static("no-cache")),
            ],
            Json(token),
        )
            .into_response(),
        Err(err) => {
            tracing::info!(%client_id, error = %err, "token request rejected");
            error_response(&err)
        }
    }
}

/// Client credentials from HTTP Basic auth, falling back to form fields.
fn client_credentials(headers: &HeaderMap, request: &TokenRequest) -> Option<(String, String)> {
    if let Some(basic) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    {
        let decoded = STANDARD.decode(basic.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (id, secret) = decoded.split_once(':')?;
        return Some((id.to_string(), secret.to_string()));
    }
    Some((request.client_id.clone()?, request.client_secret.clone()?))
}

/// A token endpoint error with the status RFC 6749 §5.2 prescribes.
pub fn error_response(err: &AuthError) -> Response {
    let status = match err {
        AuthError::InvalidClient(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_REQUEST,
    };
    error_body(status, err)
}

/// `{"error", "error_description"}`
fn error_body(status: StatusCode, err: &AuthError) -> Response {
    let body = Json(json!({
        "error": err.error_code(),
        "error_description": err.description(),
    }));
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use crate::authorization::client_credentials;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use http::HeaderMap;
    use omcp_auth::TokenRequest;

    #[test]
    fn basic_auth_wins_over_form_fields() {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("basic-id:basic-secret");
        headers.insert(
            http::header::AUTHORIZATION,
            format!("Basic {encoded}").parse().unwrap(),
        );
        let request = TokenRequest {
            grant_type: "authorization_code".into(),
            client_id: Some("form-id".into()),
            client_secret: Some("form-secret".into()),
            ..TokenRequest::default()
        };
        assert_eq!(
            client_credentials(&headers, &request),
            Some(("basic-id".into(), "basic-secret".into()))
        );
        assert_eq!(
            client_credentials(&HeaderMap::new(), &request),
            Some(("form-id".into(), "form-secret".into()))
        );
        assert_eq!(
            client_credentials(&HeaderMap::new(), &TokenRequest::default()),
            None
        );
    }
}
