//! Identity and subscription tier collaborators.

use crate::config::{AuthSettings, ServerSettings};
use crate::content_store::Tier;
use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use std::collections::HashMap;
use tracing::debug;

/// User id used when development mode lets unauthenticated requests through.
pub const DEV_USER_ID: &str = "dev_user_123";

/// Resolves the caller's identity from request headers.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<String>;
}

/// Resolves a user's subscription tier.
#[async_trait]
pub trait TierResolver: Send + Sync {
    async fn tier(&self, user_id: &str) -> Tier;
}

/// Bearer tokens mapped to user ids from configuration.
pub struct TokenAuthenticator {
    tokens: HashMap<String, String>,
    dev_mode: bool,
}

impl TokenAuthenticator {
    pub fn new(auth: &AuthSettings, server: &ServerSettings) -> Self {
        Self {
            tokens: auth.tokens.clone(),
            dev_mode: server.dev_mode,
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

#[async_trait]
impl Authenticator for TokenAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        let user = bearer_token(headers).and_then(|token| self.tokens.get(token).cloned());
        match user {
            Some(user) => Some(user),
            None if self.dev_mode => {
                debug!("No authenticated user, using development fallback");
                Some(DEV_USER_ID.to_string())
            }
            None => None,
        }
    }
}

/// Tiers from a fixed user id map. Unknown users are on the free tier.
pub struct StaticTierResolver {
    tiers: HashMap<String, Tier>,
}

impl StaticTierResolver {
    pub fn new(auth: &AuthSettings) -> Self {
        Self {
            tiers: auth.tiers.clone(),
        }
    }
}

#[async_trait]
impl TierResolver for StaticTierResolver {
    async fn tier(&self, user_id: &str) -> Tier {
        self.tiers.get(user_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn auth_settings() -> AuthSettings {
        let mut auth = AuthSettings::default();
        auth.tokens.insert("tok-ada".to_string(), "ada".to_string());
        auth.tiers.insert("ada".to_string(), Tier::Ultra);
        auth
    }

    #[tokio::test]
    async fn test_bearer_token_lookup() {
        let authenticator = TokenAuthenticator::new(&auth_settings(), &ServerSettings::default());

        let mut headers = HeaderMap::new();
        assert_eq!(authenticator.authenticate(&headers).await, None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer tok-ada"));
        assert_eq!(authenticator.authenticate(&headers).await.as_deref(), Some("ada"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert_eq!(authenticator.authenticate(&headers).await, None);
    }

    #[tokio::test]
    async fn test_dev_mode_fallback() {
        let server = ServerSettings {
            dev_mode: true,
            ..ServerSettings::default()
        };
        let authenticator = TokenAuthenticator::new(&auth_settings(), &server);
        assert_eq!(
            authenticator.authenticate(&HeaderMap::new()).await.as_deref(),
            Some(DEV_USER_ID)
        );
    }

    #[tokio::test]
    async fn test_static_tiers() {
        let resolver = StaticTierResolver::new(&auth_settings());
        assert_eq!(resolver.tier("ada").await, Tier::Ultra);
        assert_eq!(resolver.tier("bob").await, Tier::Free);
    }
}
