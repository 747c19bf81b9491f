//! In-memory storage for authorization codes and access tokens.
//!
//! A [`TokenStore`] is an owned value: construct one per service and hand
//! clones to the authorization server and the resource guard. Clones share
//! the same maps.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::scope::ScopeSet;

/// An issued, not yet exchanged authorization code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: ScopeSet,
    pub state: String,
    pub issued_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// A code is expired once `ttl` has fully elapsed since issue.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now >= self.issued_at + ttl
    }
}

/// An opaque bearer token and the grant it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub client_id: String,
    pub scope: ScopeSet,
    /// `None` means the token never expires.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Default)]
struct Maps {
    codes: HashMap<String, AuthorizationCode>,
    tokens: HashMap<String, AccessToken>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    maps: Arc<Mutex<Maps>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Maps> {
        self.maps.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put_code(&self, record: AuthorizationCode) {
        self.lock().codes.insert(record.code.clone(), record);
    }

    /// Remove and return a code. Lookup and removal happen under one lock,
    /// so a code can be taken at most once.
    pub fn take_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.lock().codes.remove(code)
    }

    pub fn put_token(&self, record: AccessToken) {
        self.lock().tokens.insert(record.token.clone(), record);
    }

    pub fn get_token(&self, token: &str) -> Option<AccessToken> {
        self.lock().tokens.get(token).cloned()
    }

    /// Drop codes older than `ttl`. Returns how many were removed.
    pub fn purge_expired_codes(&self, ttl: Duration, now: DateTime<Utc>) -> usize {
        let mut maps = self.lock();
        let before = maps.codes.len();
        maps.codes.retain(|_, record| !record.is_expired(ttl, now));
        before - maps.codes.len()
    }

    /// Drop tokens whose expiry has passed. Tokens without an expiry stay.
    pub fn purge_expired_tokens(&self, now: DateTime<Utc>) -> usize {
        let mut maps = self.lock();
        let before = maps.tokens.len();
        maps.tokens.retain(|_, record| !record.is_expired(now));
        before - maps.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use crate::scope::ScopeSet;
    use crate::store::{AccessToken, AuthorizationCode, TokenStore};

    fn code(code: &str) -> AuthorizationCode {
        AuthorizationCode {
            code: code.into(),
            client_id: "client".into(),
            redirect_uri: "http://cb".into(),
            scope: ScopeSet::parse("read"),
            state: "xyz".into(),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn take_code_is_single_use() {
        let store = TokenStore::new();
        store.put_code(code("abc"));
        assert!(store.take_code("abc").is_some());
        assert!(store.take_code("abc").is_none());
    }

    #[test]
    fn concurrent_takes_yield_one_winner() {
        let store = TokenStore::new();
        store.put_code(code("race"));
        let wins = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let wins = wins.clone();
                std::thread::spawn(move || {
                    if store.take_code("race").is_some() {
                        wins.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(wins.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn get_token_does_not_consume() {
        let store = TokenStore::new();
        store.put_token(AccessToken {
            token: "t".into(),
            client_id: "client".into(),
            scope: ScopeSet::parse("read"),
            expires_at: None,
        });
        assert!(store.get_token("t").is_some());
        assert!(store.get_token("t").is_some());
        assert!(store.get_token("missing").is_none());
    }

    #[test]
    fn expiry() {
        let now = Utc::now();
        let token = AccessToken {
            token: "t".into(),
            client_id: "c".into(),
            scope: ScopeSet::new(),
            expires_at: Some(now - Duration::seconds(1)),
        };
        assert!(token.is_expired(now));
        assert!(!AccessToken { expires_at: None, ..token }.is_expired(now));

        let store = TokenStore::new();
        store.put_code(AuthorizationCode {
            issued_at: now - Duration::seconds(120),
            ..code("old")
        });
        store.put_code(code("fresh"));
        assert_eq!(store.purge_expired_codes(Duration::seconds(60), Utc::now()), 1);
        assert!(store.take_code("fresh").is_some());
    }

    #[test]
    fn purge_expired_tokens_keeps_live_and_unbounded() {
        let now = Utc::now();
        let token = |name: &str, expires_at| AccessToken {
            token: name.into(),
            client_id: "client".into(),
            scope: ScopeSet::parse("read"),
            expires_at,
        };
        let store = TokenStore::new();
        store.put_token(token("stale", Some(now - Duration::seconds(1))));
        store.put_token(token("live", Some(now + Duration::seconds(60))));
        store.put_token(token("static", None));

        assert_eq!(store.purge_expired_tokens(now), 1);
        assert!(store.get_token("stale").is_none());
        assert!(store.get_token("live").is_some());
        assert!(store.get_token("static").is_some());
        assert_eq!(store.purge_expired_tokens(now), 0);
    }
}
