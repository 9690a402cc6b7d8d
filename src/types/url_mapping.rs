//! [`UrlMapping`] — the persisted, technical binding from a
//! [`crate::types::UrlConfiguration`] to the extractor(s) that serve it
//! plus the knobs the dispatcher applies before invoking them. Kept
//! distinct from the in-process URL-mapping *combinator*
//! (`crate::strategy::url_mapping`), which does domain/regex-based routing
//! entirely inside a single composite strategy instance and never touches
//! this store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlMapping {
    pub id: Uuid,
    pub url_config_id: Uuid,
    /// Denormalized at create time from the owning configuration; the
    /// dispatcher's exact-equality lookup key.
    pub url: String,
    /// At least one; order is the order strategies are invoked/merged in
    /// when more than one extractor is named.
    pub extractor_ids: Vec<String>,
    /// Requests per 60-second window. The window is fixed at 60s and the
    /// budget is assigned to the mapping rather than the configuration
    /// (see the Open Question resolution in DESIGN.md).
    pub rate_limit: i32,
    pub priority: i32,
    #[serde(default)]
    pub crawler_settings: Value,
    #[serde(default)]
    pub validation_rules: Value,
    #[serde(default)]
    pub metadata: Value,
    pub is_active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_rate_limit() -> i32 {
    60
}

fn default_priority() -> i32 {
    1
}

/// Fields a caller supplies when creating a mapping; `id`, `created_at`,
/// `updated_at` are assigned by the store. `extractor_ids` must be
/// non-empty — enforced by the HTTP handler, which rejects an empty list
/// with a 422.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUrlMapping {
    pub url_config_id: Uuid,
    pub url: String,
    pub extractor_ids: Vec<String>,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: i32,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub crawler_settings: Value,
    #[serde(default)]
    pub validation_rules: Value,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
}

/// Partial update; every field is optional, `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlMappingUpdate {
    pub url: Option<String>,
    pub extractor_ids: Option<Vec<String>>,
    pub rate_limit: Option<i32>,
    pub priority: Option<i32>,
    pub crawler_settings: Option<Value>,
    pub validation_rules: Option<Value>,
    pub metadata: Option<Value>,
    pub is_active: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub category: Option<String>,
}
