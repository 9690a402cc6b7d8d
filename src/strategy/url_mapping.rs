//! URL-mapping combinator.
//!
//! A strategy composed of matchers that each own a sub-strategy, tried in
//! priority order (highest first), falling back to a configured fallback
//! strategy when nothing matches. This is purely an in-process routing
//! combinator — it never touches the persisted `url_mappings` table, which
//! the resolver/dispatcher (`crate::dispatch`) consults for exact-match
//! routing instead.

use async_trait::async_trait;
use regex::Regex;
use url::Url;

use crate::error::{StrategyError, StrategyResult};

use super::{ExtractOpts, ExtractionRecord, Strategy};

/// Matches a URL either by domain (with optional subdomain coverage) or by
/// regex pattern.
pub enum UrlMatcher {
    Domain {
        domain: String,
        include_subdomains: bool,
    },
    Pattern(Regex),
}

impl UrlMatcher {
    pub fn domain(domain: impl Into<String>, include_subdomains: bool) -> Self {
        UrlMatcher::Domain {
            domain: domain.into().to_lowercase(),
            include_subdomains,
        }
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(UrlMatcher::Pattern(Regex::new(pattern)?))
    }

    fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatcher::Domain {
                domain,
                include_subdomains,
            } => {
                let Ok(parsed) = Url::parse(url) else {
                    return false;
                };
                let Some(host) = parsed.host_str() else {
                    return false;
                };
                let host = host.to_lowercase();
                host == *domain || (*include_subdomains && host.ends_with(&format!(".{domain}")))
            }
            UrlMatcher::Pattern(re) => re.is_match(url),
        }
    }
}

struct Mapping {
    matcher: UrlMatcher,
    strategy: std::sync::Arc<dyn Strategy>,
    priority: i32,
}

pub struct UrlMappingStrategy {
    name: String,
    mappings: Vec<Mapping>,
    fallback: Option<std::sync::Arc<dyn Strategy>>,
}

impl UrlMappingStrategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: std::sync::Arc<dyn Strategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn add_mapping(mut self, matcher: UrlMatcher, strategy: std::sync::Arc<dyn Strategy>, priority: i32) -> Self {
        self.mappings.push(Mapping {
            matcher,
            strategy,
            priority,
        });
        self
    }

    fn resolve(&self, url: &str) -> Option<&std::sync::Arc<dyn Strategy>> {
        let mut sorted: Vec<&Mapping> = self.mappings.iter().collect();
        sorted.sort_by(|a, b| b.priority.cmp(&a.priority));
        sorted
            .into_iter()
            .find(|m| m.matcher.matches(url))
            .map(|m| &m.strategy)
            .or(self.fallback.as_ref())
    }
}

#[async_trait]
impl Strategy for UrlMappingStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        url: &str,
        content: &str,
        opts: &ExtractOpts,
    ) -> StrategyResult<ExtractionRecord> {
        let strategy = self.resolve(url).ok_or_else(|| {
            StrategyError::Configuration(format!("no mapping or fallback matched url '{url}'"))
        })?;
        strategy.extract(url, content, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ExtractionMeta;
    use serde_json::json;

    struct Tagged(&'static str);

    #[async_trait]
    impl Strategy for Tagged {
        fn name(&self) -> &str {
            self.0
        }

        async fn extract(&self, url: &str, _content: &str, _opts: &ExtractOpts) -> StrategyResult<ExtractionRecord> {
            Ok(ExtractionRecord::new(json!({"tag": self.0}), ExtractionMeta::new(self.0, url)))
        }
    }

    #[tokio::test]
    async fn domain_match_wins_over_fallback() {
        let strategy = UrlMappingStrategy::new("router")
            .add_mapping(
                UrlMatcher::domain("example.com", true),
                std::sync::Arc::new(Tagged("domain-specific")),
                10,
            )
            .with_fallback(std::sync::Arc::new(Tagged("fallback")));

        let record = strategy
            .extract("https://news.example.com/a", "content", &ExtractOpts::default())
            .await
            .unwrap();
        assert_eq!(record.data["tag"], "domain-specific");
    }

    #[tokio::test]
    async fn unmatched_url_uses_fallback() {
        let strategy = UrlMappingStrategy::new("router")
            .add_mapping(UrlMatcher::domain("example.com", false), std::sync::Arc::new(Tagged("specific")), 10)
            .with_fallback(std::sync::Arc::new(Tagged("fallback")));

        let record = strategy
            .extract("https://other.com/a", "content", &ExtractOpts::default())
            .await
            .unwrap();
        assert_eq!(record.data["tag"], "fallback");
    }

    #[tokio::test]
    async fn no_match_and_no_fallback_errors() {
        let strategy = UrlMappingStrategy::new("router");
        let result = strategy
            .extract("https://other.com/a", "content", &ExtractOpts::default())
            .await;
        assert!(result.is_err());
    }
}
