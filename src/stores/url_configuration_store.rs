//! SQLite-backed store for [`UrlConfiguration`] records.
//!
//! JSON fields are stored as TEXT and decoded at the row boundary, the
//! same encoding this crate's other row structs use.

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::url_configuration::{NewUrlConfiguration, UrlConfigurationUpdate};
use crate::types::UrlConfiguration;

pub struct UrlConfigurationStore {
    pool: SqlitePool,
}

/// Group-by counts returned by [`UrlConfigurationStore::stats`].
#[derive(Debug, Clone, serde::Serialize, Default)]
pub struct UrlConfigurationStats {
    pub total: i64,
    pub active: i64,
    pub by_category: std::collections::HashMap<String, i64>,
    pub by_profile_type: std::collections::HashMap<String, i64>,
}

#[derive(FromRow)]
struct UrlConfigurationRow {
    id: String,
    name: String,
    description: Option<String>,
    url: String,
    profile_type: String,
    category: String,
    business_priority: i64,
    scraping_difficulty: Option<String>,
    has_official_api: bool,
    api_pricing: Option<String>,
    recommendation: Option<String>,
    key_data_points: String,
    target_data: String,
    rationale: Option<String>,
    cost_analysis: String,
    business_value: Option<String>,
    compliance_notes: Option<String>,
    is_active: bool,
    metadata: String,
    created_at: String,
    updated_at: String,
}

/// Decode a JSON-as-TEXT column. Invalid JSON decodes to an empty
/// object/array rather than failing the read outright — a corrupted field
/// should never hard-fail a fetch.
fn decode_json_or_default(raw: &str, default: Value) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid JSON in stored column, substituting default");
        default
    })
}

impl UrlConfigurationRow {
    fn into_entity(self) -> StoreResult<UrlConfiguration> {
        Ok(UrlConfiguration {
            id: Uuid::parse_str(&self.id).map_err(|e| StoreError::Database(e.to_string()))?,
            name: self.name,
            description: self.description,
            url: self.url,
            profile_type: self.profile_type,
            category: self.category,
            business_priority: self.business_priority as i32,
            scraping_difficulty: self.scraping_difficulty,
            has_official_api: self.has_official_api,
            api_pricing: self.api_pricing,
            recommendation: self.recommendation,
            key_data_points: serde_json::from_str(&self.key_data_points).unwrap_or_default(),
            target_data: decode_json_or_default(&self.target_data, serde_json::json!({})),
            rationale: self.rationale,
            cost_analysis: decode_json_or_default(&self.cost_analysis, serde_json::json!({})),
            business_value: self.business_value,
            compliance_notes: self.compliance_notes,
            is_active: self.is_active,
            metadata: decode_json_or_default(&self.metadata, serde_json::json!({})),
            created_at: self
                .created_at
                .parse()
                .map_err(|e: chrono::ParseError| StoreError::Database(e.to_string()))?,
            updated_at: self
                .updated_at
                .parse()
                .map_err(|e: chrono::ParseError| StoreError::Database(e.to_string()))?,
        })
    }
}

impl UrlConfigurationStore {
    pub async fn new(database_url: &str) -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&super::normalize_sqlite_url(database_url))
            .await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub async fn in_memory() -> StoreResult<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS url_configurations (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                url TEXT NOT NULL,
                profile_type TEXT NOT NULL,
                category TEXT NOT NULL,
                business_priority INTEGER NOT NULL DEFAULT 1,
                scraping_difficulty TEXT,
                has_official_api BOOLEAN NOT NULL DEFAULT 0,
                api_pricing TEXT,
                recommendation TEXT,
                key_data_points TEXT NOT NULL DEFAULT '[]',
                target_data TEXT NOT NULL DEFAULT '{}',
                rationale TEXT,
                cost_analysis TEXT NOT NULL DEFAULT '{}',
                business_value TEXT,
                compliance_notes TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                metadata TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for (name, ddl) in [
            ("idx_url_configs_profile_type", "CREATE INDEX IF NOT EXISTS idx_url_configs_profile_type ON url_configurations(profile_type)"),
            ("idx_url_configs_category", "CREATE INDEX IF NOT EXISTS idx_url_configs_category ON url_configurations(category)"),
            ("idx_url_configs_business_priority", "CREATE INDEX IF NOT EXISTS idx_url_configs_business_priority ON url_configurations(business_priority DESC)"),
            ("idx_url_configs_active", "CREATE INDEX IF NOT EXISTS idx_url_configs_active ON url_configurations(is_active)"),
            ("idx_url_configs_url", "CREATE INDEX IF NOT EXISTS idx_url_configs_url ON url_configurations(url)"),
        ] {
            sqlx::query(ddl).execute(&self.pool).await.map_err(|e| {
                StoreError::Database(format!("failed creating index {name}: {e}"))
            })?;
        }

        Ok(())
    }

    pub async fn create(&self, input: NewUrlConfiguration) -> StoreResult<UrlConfiguration> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        if self.get_by_name(&input.name).await?.is_some() {
            return Err(StoreError::Duplicate(format!(
                "a url_configuration named '{}' already exists",
                input.name
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO url_configurations (
                id, name, description, url, profile_type, category, business_priority,
                scraping_difficulty, has_official_api, api_pricing, recommendation,
                key_data_points, target_data, rationale, cost_analysis, business_value,
                compliance_notes, is_active, metadata, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.url)
        .bind(&input.profile_type)
        .bind(&input.category)
        .bind(input.business_priority)
        .bind(&input.scraping_difficulty)
        .bind(input.has_official_api)
        .bind(&input.api_pricing)
        .bind(&input.recommendation)
        .bind(serde_json::to_string(&input.key_data_points).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&input.target_data).unwrap_or_else(|_| "{}".to_string()))
        .bind(&input.rationale)
        .bind(serde_json::to_string(&input.cost_analysis).unwrap_or_else(|_| "{}".to_string()))
        .bind(&input.business_value)
        .bind(&input.compliance_notes)
        .bind(serde_json::to_string(&input.metadata).unwrap_or_else(|_| "{}".to_string()))
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get(id).await?.ok_or_else(|| {
            StoreError::Database("just-inserted row not found".to_string())
        })
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<UrlConfiguration>> {
        let row = sqlx::query_as::<_, UrlConfigurationRow>(
            "SELECT * FROM url_configurations WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UrlConfigurationRow::into_entity).transpose()
    }

    pub async fn get_by_url(&self, url: &str) -> StoreResult<Option<UrlConfiguration>> {
        let row = sqlx::query_as::<_, UrlConfigurationRow>(
            "SELECT * FROM url_configurations WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UrlConfigurationRow::into_entity).transpose()
    }

    pub async fn get_by_name(&self, name: &str) -> StoreResult<Option<UrlConfiguration>> {
        let row = sqlx::query_as::<_, UrlConfigurationRow>(
            "SELECT * FROM url_configurations WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UrlConfigurationRow::into_entity).transpose()
    }

    /// Case-insensitive substring search over `name`, `description`, `url`.
    pub async fn search(&self, query: &str) -> StoreResult<Vec<UrlConfiguration>> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, UrlConfigurationRow>(
            r#"
            SELECT * FROM url_configurations
            WHERE name LIKE ? COLLATE NOCASE
               OR description LIKE ? COLLATE NOCASE
               OR url LIKE ? COLLATE NOCASE
            ORDER BY updated_at DESC
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UrlConfigurationRow::into_entity).collect()
    }

    pub async fn stats(&self) -> StoreResult<UrlConfigurationStats> {
        let configs = self.list(None, false).await?;
        let mut stats = UrlConfigurationStats {
            total: configs.len() as i64,
            ..Default::default()
        };
        for config in &configs {
            if config.is_active {
                stats.active += 1;
            }
            *stats.by_category.entry(config.category.clone()).or_insert(0) += 1;
            *stats
                .by_profile_type
                .entry(config.profile_type.clone())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }

    pub async fn list(&self, category: Option<&str>, active_only: bool) -> StoreResult<Vec<UrlConfiguration>> {
        let rows = match (category, active_only) {
            (Some(cat), true) => {
                sqlx::query_as::<_, UrlConfigurationRow>(
                    "SELECT * FROM url_configurations WHERE category = ? AND is_active = 1 ORDER BY business_priority DESC",
                )
                .bind(cat)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(cat), false) => {
                sqlx::query_as::<_, UrlConfigurationRow>(
                    "SELECT * FROM url_configurations WHERE category = ? ORDER BY business_priority DESC",
                )
                .bind(cat)
                .fetch_all(&self.pool)
                .await?
            }
            (None, true) => {
                sqlx::query_as::<_, UrlConfigurationRow>(
                    "SELECT * FROM url_configurations WHERE is_active = 1 ORDER BY business_priority DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            (None, false) => {
                sqlx::query_as::<_, UrlConfigurationRow>(
                    "SELECT * FROM url_configurations ORDER BY business_priority DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(UrlConfigurationRow::into_entity).collect()
    }

    pub async fn update(&self, id: Uuid, update: UrlConfigurationUpdate) -> StoreResult<UrlConfiguration> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("url_configuration {id}")))?;

        let merged = UrlConfiguration {
            name: update.name.unwrap_or(existing.name),
            description: update.description.or(existing.description),
            url: update.url.unwrap_or(existing.url),
            profile_type: update.profile_type.unwrap_or(existing.profile_type),
            category: update.category.unwrap_or(existing.category),
            business_priority: update.business_priority.unwrap_or(existing.business_priority),
            scraping_difficulty: update.scraping_difficulty.or(existing.scraping_difficulty),
            has_official_api: update.has_official_api.unwrap_or(existing.has_official_api),
            api_pricing: update.api_pricing.or(existing.api_pricing),
            recommendation: update.recommendation.or(existing.recommendation),
            key_data_points: update.key_data_points.unwrap_or(existing.key_data_points),
            target_data: update.target_data.unwrap_or(existing.target_data),
            rationale: update.rationale.or(existing.rationale),
            cost_analysis: update.cost_analysis.unwrap_or(existing.cost_analysis),
            business_value: update.business_value.or(existing.business_value),
            compliance_notes: update.compliance_notes.or(existing.compliance_notes),
            is_active: update.is_active.unwrap_or(existing.is_active),
            metadata: update.metadata.unwrap_or(existing.metadata),
            updated_at: Utc::now(),
            ..existing
        };

        sqlx::query(
            r#"
            UPDATE url_configurations SET
                name = ?, description = ?, url = ?, profile_type = ?, category = ?,
                business_priority = ?, scraping_difficulty = ?, has_official_api = ?,
                api_pricing = ?, recommendation = ?, key_data_points = ?, target_data = ?,
                rationale = ?, cost_analysis = ?, business_value = ?, compliance_notes = ?,
                is_active = ?, metadata = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(&merged.url)
        .bind(&merged.profile_type)
        .bind(&merged.category)
        .bind(merged.business_priority)
        .bind(&merged.scraping_difficulty)
        .bind(merged.has_official_api)
        .bind(&merged.api_pricing)
        .bind(&merged.recommendation)
        .bind(serde_json::to_string(&merged.key_data_points).unwrap_or_else(|_| "[]".to_string()))
        .bind(serde_json::to_string(&merged.target_data).unwrap_or_else(|_| "{}".to_string()))
        .bind(&merged.rationale)
        .bind(serde_json::to_string(&merged.cost_analysis).unwrap_or_else(|_| "{}".to_string()))
        .bind(&merged.business_value)
        .bind(&merged.compliance_notes)
        .bind(merged.is_active)
        .bind(serde_json::to_string(&merged.metadata).unwrap_or_else(|_| "{}".to_string()))
        .bind(merged.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(merged)
    }

    /// Returns `false` rather than erroring on a second delete of the same
    /// id. Cascading the delete to dependent `url_mappings` rows is the API
    /// layer's job (see `crate::api::handlers::url_configurations`) since
    /// the two stores may live in separate SQLite files.
    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM url_configurations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewUrlConfiguration {
        NewUrlConfiguration {
            name: "Example News".to_string(),
            description: Some("A news site".to_string()),
            url: "https://example-news.test".to_string(),
            profile_type: "news".to_string(),
            category: "news".to_string(),
            business_priority: 5,
            scraping_difficulty: Some("low".to_string()),
            has_official_api: false,
            api_pricing: None,
            recommendation: Some("scrape".to_string()),
            key_data_points: vec!["headline".to_string(), "author".to_string()],
            target_data: serde_json::json!({}),
            rationale: None,
            cost_analysis: serde_json::json!({}),
            business_value: None,
            compliance_notes: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = UrlConfigurationStore::in_memory().await.unwrap();
        let created = store.create(sample()).await.unwrap();
        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.url, "https://example-news.test");
        assert_eq!(fetched.key_data_points, vec!["headline", "author"]);
    }

    #[tokio::test]
    async fn update_merges_only_supplied_fields() {
        let store = UrlConfigurationStore::in_memory().await.unwrap();
        let created = store.create(sample()).await.unwrap();

        let update = UrlConfigurationUpdate {
            business_priority: Some(9),
            ..Default::default()
        };
        let updated = store.update(created.id, update).await.unwrap();
        assert_eq!(updated.business_priority, 9);
        assert_eq!(updated.name, "Example News");
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = UrlConfigurationStore::in_memory().await.unwrap();
        let created = store.create(sample()).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_category_and_active() {
        let store = UrlConfigurationStore::in_memory().await.unwrap();
        store.create(sample()).await.unwrap();
        let mut other = sample();
        other.category = "crypto".to_string();
        other.url = "https://other.test".to_string();
        store.create(other).await.unwrap();

        let news_only = store.list(Some("news"), true).await.unwrap();
        assert_eq!(news_only.len(), 1);
    }
}
