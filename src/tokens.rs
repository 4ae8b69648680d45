//! Placeholder token resolution.
//!
//! Free-text queries and query templates may embed placeholder tokens
//! (`{searchTerms}`, caller-defined variables). Resolution is an external
//! concern: the compiler only needs the [`TokenResolver`] capability and
//! propagates its failures unmodified, with no local retry.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// The pass-through placeholder substituted with the user's free text.
pub const SEARCH_TERMS_TOKEN: &str = "{searchTerms}";

/// Asynchronous token-substitution capability.
#[async_trait]
pub trait TokenResolver: Send + Sync {
    /// Substitute every known placeholder in `text`. Unknown placeholders
    /// are left in place for the service to reject or ignore.
    async fn resolve(&self, text: &str) -> Result<String>;
}

/// Resolver backed by a fixed token table.
///
/// Sufficient for the CLI and for tests; richer hosts plug in their own
/// implementation carrying user/profile/date tokens.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that maps [`SEARCH_TERMS_TOKEN`] to the given query text.
    pub fn for_query(query_text: &str) -> Self {
        let mut resolver = Self::new();
        resolver
            .tokens
            .insert(SEARCH_TERMS_TOKEN.to_string(), query_text.to_string());
        resolver
    }

    /// Register a token by bare name (without braces).
    pub fn set(&mut self, name: &str, value: &str) {
        self.tokens
            .insert(format!("{{{}}}", name), value.to_string());
    }
}

#[async_trait]
impl TokenResolver for StaticTokenResolver {
    async fn resolve(&self, text: &str) -> Result<String> {
        let mut resolved = text.to_string();
        for (token, value) in &self.tokens {
            if resolved.contains(token.as_str()) {
                resolved = resolved.replace(token.as_str(), value);
            }
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_terms_substitution() {
        let resolver = StaticTokenResolver::for_query("report");
        let resolved = resolver
            .resolve("{searchTerms} path:https://contoso.example")
            .await
            .unwrap();
        assert_eq!(resolved, "report path:https://contoso.example");
    }

    #[tokio::test]
    async fn test_unknown_tokens_left_in_place() {
        let resolver = StaticTokenResolver::for_query("report");
        let resolved = resolver.resolve("{searchTerms} {User.mail}").await.unwrap();
        assert_eq!(resolved, "report {User.mail}");
    }

    #[tokio::test]
    async fn test_repeated_token() {
        let mut resolver = StaticTokenResolver::new();
        resolver.set("Scope", "engineering");
        let resolved = resolver.resolve("{Scope} AND dept:{Scope}").await.unwrap();
        assert_eq!(resolved, "engineering AND dept:engineering");
    }
}
