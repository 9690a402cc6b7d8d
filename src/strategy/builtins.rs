//! Compile-time strategy registration.
//!
//! Each registration closure here builds one category-specific extraction
//! strategy (e.g. a crypto-focused LLM extractor). Config shape is
//! `{"api_key": "...", "provider": "...", "model": "...", "base_url": "..."}`,
//! read by the constructor closure to build an [`crate::llm::OpenAiClient`],
//! extended with a provider tag so OpenRouter and other OpenAI-compatible
//! endpoints can be targeted without a new client type.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::StrategyError;
use crate::llm::{self, OpenAiClient};
use crate::types::{Category, StrategyMetadata};

use super::{LlmExtractionStrategy, Strategy, StrategyRegistry};

struct BuiltinSpec {
    name: &'static str,
    description: &'static str,
    category: Category,
    system_prompt: &'static str,
    output_schema: fn() -> Value,
}

pub fn config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "api_key": {"type": "string"},
            "provider": {"type": "string", "default": "openai"},
            "model": {"type": "string", "default": "gpt-4o"},
            "base_url": {"type": "string"}
        },
        "required": ["api_key"]
    })
}

/// Resolved provider/model/client triple, built once per-strategy so the
/// metadata attached to an extraction record matches what was actually
/// called.
pub struct ResolvedClient {
    pub client: OpenAiClient,
    pub provider: String,
    pub model: String,
}

pub fn build_client(config: &Value) -> Result<ResolvedClient, StrategyError> {
    let api_key = config
        .get("api_key")
        .and_then(Value::as_str)
        .ok_or_else(|| StrategyError::Configuration("missing 'api_key' in strategy config".to_string()))?;

    let provider = config
        .get("provider")
        .and_then(Value::as_str)
        .unwrap_or("openai")
        .to_string();
    let model = config
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("gpt-4o");
    let model = llm::normalize_model(&provider, model);
    let base_url = config
        .get("base_url")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| llm::default_base_url(&provider).to_string());

    let client = OpenAiClient::new(api_key)
        .with_model(model.clone())
        .with_base_url(base_url);

    Ok(ResolvedClient {
        client,
        provider,
        model,
    })
}

fn crypto_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "headline": {"type": "string"},
            "summary": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}},
            "cryptocurrencies": {"type": "array", "items": {"type": "string"}},
            "blockchain_projects": {"type": "array", "items": {"type": "string"}},
            "market_data": {"type": "object"},
            "sentiment": {"type": "string"},
            "events": {"type": "array", "items": {"type": "string"}}
        }
    })
}

fn news_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "headline": {"type": "string"},
            "summary": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}},
            "sources": {"type": "array", "items": {"type": "string"}},
            "publication_date": {"type": "string"},
            "author": {"type": "string"},
            "topics": {"type": "array", "items": {"type": "string"}},
            "entities": {"type": "array", "items": {"type": "string"}},
            "sentiment": {"type": "string"}
        }
    })
}

fn social_media_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "post_text": {"type": "string"},
            "user": {"type": "string"},
            "platform": {"type": "string"},
            "engagement_metrics": {"type": "object"},
            "hashtags": {"type": "array", "items": {"type": "string"}},
            "mentions": {"type": "array", "items": {"type": "string"}},
            "sentiment": {"type": "string"},
            "topics": {"type": "array", "items": {"type": "string"}}
        }
    })
}

fn product_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "product_name": {"type": "string"},
            "brand": {"type": "string"},
            "description": {"type": "string"},
            "price": {"type": "string"},
            "specifications": {"type": "object"},
            "features": {"type": "array", "items": {"type": "string"}},
            "availability": {"type": "string"}
        }
    })
}

fn financial_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "headline": {"type": "string"},
            "summary": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}},
            "market_impact": {"type": "string"},
            "financial_metrics": {"type": "object"},
            "companies": {"type": "array", "items": {"type": "string"}},
            "sentiment": {"type": "string"}
        }
    })
}

fn academic_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "abstract_summary": {"type": "string"},
            "authors": {"type": "array", "items": {"type": "string"}},
            "methodology": {"type": "string"},
            "findings": {"type": "array", "items": {"type": "string"}},
            "citations": {"type": "array", "items": {"type": "string"}}
        }
    })
}

fn general_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "summary": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}},
            "entities": {"type": "array", "items": {"type": "string"}}
        }
    })
}

const BUILTINS: &[BuiltinSpec] = &[
    BuiltinSpec {
        name: "CryptoLLMExtractionStrategy",
        description: "Extracts cryptocurrency and blockchain-related fields from content",
        category: Category::Crypto,
        system_prompt: "Extract cryptocurrency, blockchain, and market data from the provided content. Respond with JSON matching the given schema.",
        output_schema: crypto_schema,
    },
    BuiltinSpec {
        name: "NewsLLMExtractionStrategy",
        description: "Extracts headline, sources, and key points from news content",
        category: Category::News,
        system_prompt: "Extract the headline, key points, sources, and entities from the provided news content. Respond with JSON matching the given schema.",
        output_schema: news_schema,
    },
    BuiltinSpec {
        name: "SocialMediaLLMExtractionStrategy",
        description: "Extracts post text, engagement, and hashtags from social content",
        category: Category::SocialMedia,
        system_prompt: "Extract the post text, author, platform, and engagement signals from the provided social media content. Respond with JSON matching the given schema.",
        output_schema: social_media_schema,
    },
    BuiltinSpec {
        name: "ProductLLMExtractionStrategy",
        description: "Extracts product name, price, and specifications from listing content",
        category: Category::Product,
        system_prompt: "Extract the product name, brand, price, and specifications from the provided content. Respond with JSON matching the given schema.",
        output_schema: product_schema,
    },
    BuiltinSpec {
        name: "FinancialLLMExtractionStrategy",
        description: "Extracts market-moving financial data from content",
        category: Category::Financial,
        system_prompt: "Extract financial metrics, affected companies, and market impact from the provided content. Respond with JSON matching the given schema.",
        output_schema: financial_schema,
    },
    BuiltinSpec {
        name: "AcademicLLMExtractionStrategy",
        description: "Extracts title, authors, and findings from scholarly content",
        category: Category::Academic,
        system_prompt: "Extract the title, authors, methodology, and findings from the provided academic content. Respond with JSON matching the given schema.",
        output_schema: academic_schema,
    },
    BuiltinSpec {
        name: "GeneralLLMExtractionStrategy",
        description: "Generic summary extraction used as a default/sequential first pass",
        category: Category::General,
        system_prompt: "Summarize the provided content and list its key points and named entities. Respond with JSON matching the given schema.",
        output_schema: general_schema,
    },
];

/// Register every compiled-in strategy. Called once at startup and again
/// by [`StrategyRegistry::reload`].
pub fn register_all(registry: &StrategyRegistry) {
    for spec in BUILTINS {
        let system_prompt = spec.system_prompt;
        let category = spec.category;
        let schema_fn = spec.output_schema;
        let strategy_name = spec.name;

        registry.register(
            StrategyMetadata::new(
                spec.name,
                spec.description,
                spec.category,
                schema_fn(),
                config_schema(),
            ),
            Box::new(move |config: &Value| {
                let resolved = build_client(config)?;
                Ok(Box::new(
                    LlmExtractionStrategy::new(
                        strategy_name,
                        category,
                        Arc::new(resolved.client),
                        system_prompt,
                        schema_fn(),
                    )
                    .with_provider(resolved.provider)
                    .with_model(resolved.model),
                ) as Box<dyn Strategy>)
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_six_categories_plus_general() {
        let registry = StrategyRegistry::new();
        register_all(&registry);
        assert_eq!(registry.len(), BUILTINS.len());
        assert!(registry.get_metadata("CryptoLLMExtractionStrategy").is_some());
        assert!(registry.get_metadata("GeneralLLMExtractionStrategy").is_some());
    }

    #[test]
    fn build_fails_without_api_key() {
        let registry = StrategyRegistry::new();
        register_all(&registry);
        let result = registry.build("CryptoLLMExtractionStrategy", &json!({}));
        assert!(result.is_err());
    }
}
