//! [`UrlConfiguration`] — the research/business record attached to a URL a
//! deployment cares about: editorial metadata a human curates about a site,
//! distinct from [`crate::types::UrlMapping`] which is the dispatch rule
//! that picks a strategy for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfiguration {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub profile_type: String,
    pub category: String,
    pub business_priority: i32,
    pub scraping_difficulty: Option<String>,
    pub has_official_api: bool,
    pub api_pricing: Option<String>,
    pub recommendation: Option<String>,
    #[serde(default)]
    pub key_data_points: Vec<String>,
    #[serde(default)]
    pub target_data: Value,
    pub rationale: Option<String>,
    #[serde(default)]
    pub cost_analysis: Value,
    pub business_value: Option<String>,
    pub compliance_notes: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a caller supplies when creating a configuration; `id`,
/// `created_at`, `updated_at` are assigned by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUrlConfiguration {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub profile_type: String,
    pub category: String,
    #[serde(default = "default_business_priority")]
    pub business_priority: i32,
    pub scraping_difficulty: Option<String>,
    #[serde(default)]
    pub has_official_api: bool,
    pub api_pricing: Option<String>,
    pub recommendation: Option<String>,
    #[serde(default)]
    pub key_data_points: Vec<String>,
    #[serde(default)]
    pub target_data: Value,
    pub rationale: Option<String>,
    #[serde(default)]
    pub cost_analysis: Value,
    pub business_value: Option<String>,
    pub compliance_notes: Option<String>,
    #[serde(default)]
    pub metadata: Value,
}

fn default_business_priority() -> i32 {
    1
}

/// Partial update; every field is optional, `None` means "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UrlConfigurationUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub profile_type: Option<String>,
    pub category: Option<String>,
    pub business_priority: Option<i32>,
    pub scraping_difficulty: Option<String>,
    pub has_official_api: Option<bool>,
    pub api_pricing: Option<String>,
    pub recommendation: Option<String>,
    pub key_data_points: Option<Vec<String>>,
    pub target_data: Option<Value>,
    pub rationale: Option<String>,
    pub cost_analysis: Option<Value>,
    pub business_value: Option<String>,
    pub compliance_notes: Option<String>,
    pub is_active: Option<bool>,
    pub metadata: Option<Value>,
}
