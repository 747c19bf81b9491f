use std::collections::HashMap;

use crate::error::AuthError;

/// Client id of the built-in OAuth test client.
pub const TEST_CLIENT_ID: &str = "mcp-oauth-test-client";
/// Secret of the built-in OAuth test client.
pub const TEST_CLIENT_SECRET: &str = "mcp-oauth-test-secret";

/// A statically configured OAuth client.
#[derive(Clone, PartialEq, Eq)]
pub struct Client {
    pub client_id: String,
    pub client_secret: String,
}

impl Client {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Registry of known clients, fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<String, Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the built-in test client.
    pub fn with_test_client() -> Self {
        Self::new().with(Client::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
    }

    pub fn with(mut self, client: Client) -> Self {
        self.clients.insert(client.client_id.clone(), client);
        self
    }

    pub fn get(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id)
    }

    /// Look up a client by id, failing with `InvalidClient` if unknown.
    pub fn require(&self, client_id: &str) -> Result<&Client, AuthError> {
        self.get(client_id)
            .ok_or_else(|| AuthError::InvalidClient(format!("unknown client: {client_id}")))
    }

    /// Check a client's credentials.
    pub fn authenticate(&self, client_id: &str, client_secret: &str) -> Result<&Client, AuthError> {
        let client = self.require(client_id)?;
        if client.client_secret != client_secret {
            return Err(AuthError::InvalidClient(
                "client authentication failed".into(),
            ));
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::{ClientRegistry, TEST_CLIENT_ID, TEST_CLIENT_SECRET};
    use crate::error::AuthError;

    #[test]
    fn authenticate_checks_secret() {
        let clients = ClientRegistry::with_test_client();
        assert!(clients.authenticate(TEST_CLIENT_ID, TEST_CLIENT_SECRET).is_ok());
        assert!(matches!(
            clients.authenticate(TEST_CLIENT_ID, "wrong"),
            Err(AuthError::InvalidClient(_))
        ));
        assert!(matches!(
            clients.authenticate("nobody", TEST_CLIENT_SECRET),
            Err(AuthError::InvalidClient(_))
        ));
    }

    #[test]
    fn debug_hides_secret() {
        let clients = ClientRegistry::with_test_client();
        let debug = format!("{:?}", clients.get(TEST_CLIENT_ID).unwrap());
        assert!(!debug.contains(TEST_CLIENT_SECRET));
    }
}
