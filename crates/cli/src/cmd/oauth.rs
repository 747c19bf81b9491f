//! Drive the authorization-code flow against an authorization server:
//! authorize, read the code off the redirect without following it, then
//! exchange it at the token endpoint.

use clap::Args;
use omcp_auth::metadata::{AUTHORIZATION_SERVER_PATH, AUTHORIZE_PATH, TOKEN_PATH, endpoint};
use omcp_auth::{AuthorizationServerMetadata, TokenResponse};
use reqwest::StatusCode;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::{debug, info};
use url::Url;

use crate::error::Error;

#[derive(Args, Debug, Clone)]
pub struct OAuthArgs {
    /// Base URL of the authorization server.
    #[arg(long, default_value = "http://localhost:8003")]
    pub issuer: String,

    #[arg(long, default_value = omcp_auth::client::TEST_CLIENT_ID)]
    pub client_id: String,

    #[arg(long, default_value = omcp_auth::client::TEST_CLIENT_SECRET)]
    pub client_secret: String,

    #[arg(long, default_value = "read")]
    pub scope: String,

    /// Callback URL. Never contacted: the code is read from the redirect.
    #[arg(long, default_value = "http://localhost:8080/callback")]
    pub redirect_uri: String,
}

/// Pull `code` out of a redirect target, checking `state` matches.
pub fn parse_redirect(location: &str, expected_state: &str) -> Result<String, Error> {
    let url = Url::parse(location)?;
    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(Error::OAuth(format!("authorization failed: {value}"))),
            _ => {}
        }
    }
    if state.as_deref() != Some(expected_state) {
        return Err(Error::OAuth("state mismatch in redirect".into()));
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| Error::OAuth("redirect carries no code".into()))
}

/// Discover endpoints, falling back to the conventional paths.
async fn discover(http: &reqwest::Client, issuer: &str) -> (String, String) {
    let url = endpoint(issuer, AUTHORIZATION_SERVER_PATH);
    let metadata = match http.get(&url).send().await {
        Ok(response) if response.status().is_success() => {
            response.json::<AuthorizationServerMetadata>().await.ok()
        }
        _ => None,
    };
    match metadata {
        Some(metadata) => (metadata.authorization_endpoint, metadata.token_endpoint),
        None => {
            debug!(%url, "no authorization server metadata, using default endpoints");
            (endpoint(issuer, AUTHORIZE_PATH), endpoint(issuer, TOKEN_PATH))
        }
    }
}

pub async fn run(args: &OAuthArgs) -> Result<TokenResponse, Error> {
    let http = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()?;
    let (authorize_url, token_url) = discover(&http, &args.issuer).await;
    let state = uuid::Uuid::new_v4().simple().to_string();

    let response = http
        .get(&authorize_url)
        .query(&[
            ("response_type", "code"),
            ("client_id", args.client_id.as_str()),
            ("redirect_uri", args.redirect_uri.as_str()),
            ("scope", args.scope.as_str()),
            ("state", state.as_str()),
        ])
        .send()
        .await?;
    if response.status() != StatusCode::FOUND {
        return Err(Error::Status {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::OAuth("redirect without Location header".into()))?;
    let code = parse_redirect(location, &state)?;
    info!("received authorization code");

    let response = http
        .post(&token_url)
        .basic_auth(&args.client_id, Some(&args.client_secret))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", args.redirect_uri.as_str()),
        ])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(Error::Status {
            status: response.status().as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response.json().await?)
}
