//! Caller authentication used to pick the rate limit tier.

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::TokenConfig;

/// Who is calling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthContext {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Resolves the caller of a request.
///
/// Failures resolve to an anonymous caller rather than an error, so a broken
/// identity provider only costs the caller its higher quota.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthContext;
}

/// Treats every caller as anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthenticator;

#[async_trait]
impl Authenticator for AnonymousAuthenticator {
    async fn authenticate(&self, _headers: &HeaderMap) -> AuthContext {
        AuthContext::anonymous()
    }
}

/// Authenticates `Authorization: Bearer <token>` against a fixed token list.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenAuthenticator {
    users: HashMap<String, AuthContext>,
}

impl StaticTokenAuthenticator {
    pub fn new(tokens: &[TokenConfig]) -> Self {
        let users = tokens
            .iter()
            .map(|t| {
                (
                    t.token.clone(),
                    AuthContext {
                        authenticated: true,
                        user_id: Some(t.user_id.clone()),
                        email: t.email.clone(),
                    },
                )
            })
            .collect();
        Self { users }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> AuthContext {
        bearer_token(headers)
            .and_then(|token| self.users.get(token).cloned())
            .unwrap_or_else(AuthContext::anonymous)
    }
}

/// Extract the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    fn authenticator() -> StaticTokenAuthenticator {
        StaticTokenAuthenticator::new(&[TokenConfig {
            token: "s3cret".to_string(),
            user_id: "user-42".to_string(),
            email: Some("founder@example.com".to_string()),
        }])
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&with_auth("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("bearer   abc ")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("Basic abc")), None);
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_known_token_is_authenticated() {
        let ctx = authenticator().authenticate(&with_auth("Bearer s3cret")).await;

        assert!(ctx.authenticated);
        assert_eq!(ctx.user_id.as_deref(), Some("user-42"));
        assert_eq!(ctx.email.as_deref(), Some("founder@example.com"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let ctx = authenticator().authenticate(&with_auth("Bearer nope")).await;
        assert_eq!(ctx, AuthContext::anonymous());

        let ctx = AnonymousAuthenticator
            .authenticate(&with_auth("Bearer s3cret"))
            .await;
        assert!(!ctx.authenticated);
    }
}
