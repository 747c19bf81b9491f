use chrono::Utc;
use tracing::debug;

use crate::error::AuthFailure;
use crate::scope::ScopeSet;
use crate::server::redact;
use crate::store::TokenStore;

/// What an admitted request is allowed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub client_id: String,
    pub scope: ScopeSet,
}

/// Validates bearer tokens against a [`TokenStore`].
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    store: TokenStore,
}

impl ResourceGuard {
    pub fn new(store: TokenStore) -> Self {
        Self { store }
    }

    /// Admit a request carrying `token` if it grants every scope in `required`.
    pub fn authorize_request(&self, token: Option<&str>, required: &ScopeSet) -> Result<Grant, AuthFailure> {
        let token = token.ok_or(AuthFailure::Unauthenticated)?;
        let record = self.store.get_token(token).ok_or_else(|| {
            debug!(token = %redact(token), "rejected unknown token");
            AuthFailure::InvalidToken
        })?;

        if record.is_expired(Utc::now()) {
            debug!(client_id = %record.client_id, "rejected expired token");
            return Err(AuthFailure::TokenExpired);
        }
        if !record.scope.covers(required) {
            debug!(client_id = %record.client_id, %required, granted = %record.scope, "rejected token lacking scope");
            return Err(AuthFailure::InsufficientScope {
                required: required.clone(),
                granted: record.scope,
            });
        }

        Ok(Grant {
            client_id: record.client_id,
            scope: record.scope,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use crate::error::AuthFailure;
    use crate::guard::ResourceGuard;
    use crate::scope::ScopeSet;
    use crate::store::{AccessToken, TokenStore};

    fn guard_with(expires_at: Option<chrono::DateTime<Utc>>) -> ResourceGuard {
        let store = TokenStore::new();
        store.put_token(AccessToken {
            token: "tok".into(),
            client_id: "client".into(),
            scope: ScopeSet::parse("read"),
            expires_at,
        });
        ResourceGuard::new(store)
    }

    #[test]
    fn valid_token_yields_grant() {
        let guard = guard_with(Some(Utc::now() + Duration::seconds(60)));
        let grant = guard
            .authorize_request(Some("tok"), &ScopeSet::parse("read"))
            .unwrap();
        assert_eq!(grant.client_id, "client");
        assert!(grant.scope.contains("read"));
    }

    #[test]
    fn failures_are_distinguishable() {
        let guard = guard_with(None);
        let read = ScopeSet::parse("read");
        assert_eq!(guard.authorize_request(None, &read), Err(AuthFailure::Unauthenticated));
        assert_eq!(
            guard.authorize_request(Some("other"), &read),
            Err(AuthFailure::InvalidToken)
        );
        assert!(matches!(
            guard.authorize_request(Some("tok"), &ScopeSet::parse("read write")),
            Err(AuthFailure::InsufficientScope { .. })
        ));
    }

    #[test]
    fn past_expiry_never_succeeds() {
        for seconds in [1, 60, 3600, 86_400 * 365] {
            let guard = guard_with(Some(Utc::now() - Duration::seconds(seconds)));
            assert_eq!(
                guard.authorize_request(Some("tok"), &ScopeSet::new()),
                Err(AuthFailure::TokenExpired)
            );
        }
    }
}
