//! `WWW-Authenticate` challenges for MCP resource servers.
//!
//! Header formats follow [RFC 6750 §3](https://datatracker.ietf.org/doc/html/rfc6750#section-3)
//! and the `resource_metadata` parameter of
//! [RFC 9728 §5.1](https://datatracker.ietf.org/doc/html/rfc9728#name-www-authenticate-response).

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::{HeaderValue, StatusCode};
use omcp_auth::AuthFailure;
use serde_json::json;

/// Configuration for an MCP server acting as an OAuth 2.1 resource server.
#[derive(Clone, Debug)]
pub struct ResourceServerConfig {
    /// URL of the Protected Resource Metadata document.
    ///
    /// Included as `resource_metadata="..."` in `WWW-Authenticate` headers.
    pub resource_metadata_url: String,
    /// Scopes named in 401 challenges.
    pub default_scope: Option<String>,
}

fn header(value: String) -> HeaderValue {
    // Only fails on control characters, which configured URLs and scopes
    // never contain.
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("Bearer"))
}

/// `Bearer resource_metadata="<url>"[, scope="<scopes>"]`, optionally
/// preceded by an `error` attribute for rejected tokens.
pub fn www_authenticate_401(config: &ResourceServerConfig, error: Option<&str>) -> HeaderValue {
    let mut value = String::from("Bearer ");
    if let Some(error) = error {
        value.push_str(&format!("error=\"{error}\", "));
    }
    value.push_str(&format!(
        "resource_metadata=\"{}\"",
        config.resource_metadata_url
    ));
    if let Some(ref scope) = config.default_scope {
        value.push_str(&format!(", scope=\"{scope}\""));
    }
    header(value)
}

/// `Bearer error="insufficient_scope", scope="<required>", resource_metadata="<url>"`
pub fn www_authenticate_403(config: &ResourceServerConfig, required_scope: &str) -> HeaderValue {
    header(format!(
        "Bearer error=\"insufficient_scope\", scope=\"{required_scope}\", resource_metadata=\"{}\"",
        config.resource_metadata_url,
    ))
}

/// Build the rejection for a failed [`AuthFailure`]: 403 for insufficient
/// scope, 401 otherwise, with a JSON body naming the error.
pub fn challenge_response(config: Option<&ResourceServerConfig>, failure: &AuthFailure) -> Response {
    let (status, challenge) = match failure {
        AuthFailure::InsufficientScope { required, .. } => (
            StatusCode::FORBIDDEN,
            config.map(|c| www_authenticate_403(c, &required.to_string())),
        ),
        other => (
            StatusCode::UNAUTHORIZED,
            config.map(|c| www_authenticate_401(c, other.error_code())),
        ),
    };

    let body = Json(json!({
        "error": failure.error_code().unwrap_or("unauthorized"),
        "error_description": failure.to_string(),
    }));
    let mut response = (status, body).into_response();
    if let Some(challenge) = challenge {
        response
            .headers_mut()
            .insert(http::header::WWW_AUTHENTICATE, challenge);
    }
    response
}
