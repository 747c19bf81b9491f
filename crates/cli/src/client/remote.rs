//! JSON-RPC over HTTP POST with `Mcp-Session-Id` correlation.

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use serde_json::Value;
use tracing::debug;

use omcp::jsonrpc::{JsonRpcMessage, RequestId};

use crate::error::Error;

const SESSION_HEADER: &str = "mcp-session-id";

/// Client for an MCP endpoint served over HTTP.
pub struct HttpClient {
    http: reqwest::Client,
    url: String,
    auth: Option<String>,
    session: Option<String>,
    next_id: i64,
}

impl HttpClient {
    pub fn new(url: impl Into<String>, auth: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            auth,
            session: None,
            next_id: 1,
        }
    }

    /// Session id assigned by the server on `initialize`.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    async fn post(&mut self, message: &JsonRpcMessage) -> Result<Option<JsonRpcMessage>, Error> {
        let mut request = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(message);
        if let Some(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        if let Some(session) = &self.session {
            request = request.header(SESSION_HEADER, session);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Err(Error::Unauthorized {
                status: status.as_u16(),
                challenge,
            });
        }
        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            debug!(%session, "server assigned session");
            self.session = Some(session.to_string());
        }
        if status == StatusCode::ACCEPTED {
            return Ok(None);
        }
        if !status.is_success() && status != StatusCode::BAD_REQUEST {
            return Err(Error::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(Some(response.json().await?))
    }

    pub async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let id = RequestId::from(self.next_id);
        self.next_id += 1;
        debug!(%method, %id, url = %self.url, "sending request");
        let response = self
            .post(&JsonRpcMessage::request(id, method, params))
            .await?
            .ok_or_else(|| Error::NoResponse(method.to_string()))?;
        Ok(response.into_result()?)
    }

    pub async fn send_notification(&mut self, method: &str, params: Option<Value>) -> Result<(), Error> {
        self.post(&JsonRpcMessage::notification(method, params))
            .await?;
        Ok(())
    }

    /// End the session with `DELETE`. A no-op before `initialize`.
    pub async fn close(&mut self) -> Result<(), Error> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let mut request = self.http.delete(&self.url).header(SESSION_HEADER, &session);
        if let Some(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        let status = request.send().await?.status();
        debug!(%session, %status, "closed session");
        Ok(())
    }
}
