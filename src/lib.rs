//! # Extraction Orchestrator
//!
//! A content-extraction orchestration service: a registry of pluggable LLM
//! extraction strategies, combinators that fan them out or chain them,
//! a content classifier that picks among them, and a resolver/dispatcher
//! that routes an incoming URL to the strategy a persisted mapping names
//! for it.
//!
//! ## Architecture
//!
//! ```text
//! StrategyRegistry (compile-time init()) → StrategyFactory → Strategy
//!                                                               ^
//! UrlMappingStore ──── exact-URL lookup ──── Dispatcher ────────┘
//! UrlConfigurationStore ── editorial metadata about a tracked site
//! ContentClassifier ── scores content, used by the Composite combinator
//! ```
//!
//! ## Modules
//!
//! - [`error`] — layered error taxonomy (Strategy/Store/Dispatch/Core)
//! - [`config`] — environment-driven [`config::AppConfig`]
//! - [`llm`] — [`llm::LlmClient`] boundary, OpenAI-compatible + mock impls
//! - [`classifier`] — keyword-based content classification
//! - [`types`] — [`types::StrategyMetadata`], [`types::UrlConfiguration`], [`types::UrlMapping`]
//! - [`strategy`] — the `Strategy` trait, registry, factory, and combinators
//! - [`stores`] — SQLite-backed persistence for configurations and mappings
//! - [`dispatch`] — resolver/dispatcher and the fixed-window rate limiter
//! - [`api`] — the HTTP surface (axum)

pub mod api;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod llm;
pub mod stores;
pub mod strategy;
pub mod types;

pub use config::AppConfig;
pub use dispatch::Dispatcher;
pub use error::{CoreError, DispatchError, Result, StoreError, StrategyError};
pub use strategy::{ExtractOpts, ExtractionRecord, Strategy, StrategyFactory, StrategyRegistry};
pub use types::{Category, StrategyMetadata, UrlConfiguration, UrlMapping};
