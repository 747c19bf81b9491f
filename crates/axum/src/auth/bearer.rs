//! Bearer token authentication.
//!
//! [`BearerAuth`] extracts the token from `Authorization: Bearer <token>` and
//! hands it to a [`Validator`]. [`GuardValidator`] checks tokens held in a
//! token store, which covers both issued and statically seeded tokens.

use omcp_auth::{AuthFailure, Grant, ResourceGuard, ScopeSet};

use crate::auth::{Authenticator, Validator};

#[derive(Clone)]
pub struct BearerAuth<V> {
    validator: V,
}

impl<V> BearerAuth<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }
}

/// The token from an `Authorization: Bearer` header, if any.
pub fn bearer_token(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<V> Authenticator for BearerAuth<V>
where
    V: Validator,
{
    type Claims = V::Claims;

    async fn authenticate(&self, parts: &http::request::Parts) -> Result<Self::Claims, AuthFailure> {
        let token = bearer_token(&parts.headers).ok_or(AuthFailure::Unauthenticated)?;
        self.validator.validate(token).await
    }
}

/// Validates tokens against a [`ResourceGuard`], requiring a fixed scope set.
#[derive(Clone, Debug)]
pub struct GuardValidator {
    guard: ResourceGuard,
    required: ScopeSet,
}

impl GuardValidator {
    pub fn new(guard: ResourceGuard, required: ScopeSet) -> Self {
        Self { guard, required }
    }
}

impl Validator for GuardValidator {
    type Claims = Grant;

    async fn validate(&self, credential: &str) -> Result<Grant, AuthFailure> {
        self.guard.authorize_request(Some(credential), &self.required)
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::bearer::bearer_token;
    use http::HeaderMap;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(http::header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(http::header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(http::header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
