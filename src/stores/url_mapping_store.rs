//! SQLite-backed store for [`UrlMapping`] records.
//!
//! Same migration/row-struct conventions as [`super::url_configuration_store`].

use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::url_mapping::{NewUrlMapping, UrlMappingUpdate};
use crate::types::UrlMapping;

pub struct UrlMappingStore {
    pool: SqlitePool,
}

#[derive(FromRow)]
struct UrlMappingRow {
    id: String,
    url_config_id: String,
    url: String,
    extractor_ids: String,
    rate_limit: i64,
    priority: i64,
    crawler_settings: String,
    validation_rules: String,
    metadata: String,
    is_active: bool,
    tags: String,
    notes: Option<String>,
    category: Option<String>,
    created_at: String,
    updated_at: String,
}

fn decode_json_or_default(raw: &str, default: Value) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid JSON in stored column, substituting default");
        default
    })
}

impl UrlMappingRow {
    fn into_entity(self) -> StoreResult<UrlMapping> {
        Ok(UrlMapping {
            id: Uuid::parse_str(&self.id).map_err(|e| StoreError::Database(e.to_string()))?,
            url_config_id: Uuid::parse_str(&self.url_config_id)
                .map_err(|e| StoreError::Database(e.to_string()))?,
            url: self.url,
            extractor_ids: serde_json::from_str(&self.extractor_ids).unwrap_or_default(),
            rate_limit: self.rate_limit as i32,
            priority: self.priority as i32,
            crawler_settings: decode_json_or_default(&self.crawler_settings, serde_json::json!({})),
            validation_rules: decode_json_or_default(&self.validation_rules, serde_json::json!({})),
            metadata: decode_json_or_default(&self.metadata, serde_json::json!({})),
            is_active: self.is_active,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
            notes: self.notes,
            category: self.category,
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

/// Group-by counts returned by [`UrlMappingStore::stats`].
#[derive(Debug, Clone, serde::Serialize, Default)]
pub struct UrlMappingStats {
    pub total: i64,
    pub active: i64,
    pub by_extractor: std::collections::HashMap<String, i64>,
    pub by_category: std::collections::HashMap<String, i64>,
}

impl UrlMappingStore {
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
            CREATE TABLE IF NOT EXISTS url_mappings (
                id TEXT PRIMARY KEY,
                url_config_id TEXT NOT NULL,
                url TEXT NOT NULL,
                extractor_ids TEXT NOT NULL DEFAULT '[]',
                rate_limit INTEGER NOT NULL DEFAULT 60,
                priority INTEGER NOT NULL DEFAULT 1,
                crawler_settings TEXT NOT NULL DEFAULT '{}',
                validation_rules TEXT NOT NULL DEFAULT '{}',
                metadata TEXT NOT NULL DEFAULT '{}',
                is_active BOOLEAN NOT NULL DEFAULT 1,
                tags TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                category TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for (name, ddl) in [
            ("idx_url_mappings_url_config_id", "CREATE INDEX IF NOT EXISTS idx_url_mappings_url_config_id ON url_mappings(url_config_id)"),
            ("idx_url_mappings_url", "CREATE INDEX IF NOT EXISTS idx_url_mappings_url ON url_mappings(url)"),
            ("idx_url_mappings_active", "CREATE INDEX IF NOT EXISTS idx_url_mappings_active ON url_mappings(is_active)"),
            ("idx_url_mappings_extractor_ids", "CREATE INDEX IF NOT EXISTS idx_url_mappings_extractor_ids ON url_mappings(extractor_ids)"),
        ] {
            sqlx::query(ddl).execute(&self.pool).await.map_err(|e| {
                StoreError::Database(format!("failed creating index {name}: {e}"))
            })?;
        }

        Ok(())
    }

    pub async fn create(&self, input: NewUrlMapping) -> StoreResult<UrlMapping> {
        if input.extractor_ids.is_empty() {
            return Err(StoreError::Validation(
                "extractor_ids must contain at least one strategy name".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO url_mappings (
                id, url_config_id, url, extractor_ids, rate_limit, priority,
                crawler_settings, validation_rules, metadata, is_active, tags,
                notes, category, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(input.url_config_id.to_string())
        .bind(&input.url)
        .bind(serde_json::to_string(&input.extractor_ids).unwrap_or_else(|_| "[]".to_string()))
        .bind(input.rate_limit.max(1))
        .bind(input.priority)
        .bind(serde_json::to_string(&input.crawler_settings).unwrap_or_else(|_| "{}".to_string()))
        .bind(serde_json::to_string(&input.validation_rules).unwrap_or_else(|_| "{}".to_string()))
        .bind(serde_json::to_string(&input.metadata).unwrap_or_else(|_| "{}".to_string()))
        .bind(serde_json::to_string(&input.tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(&input.notes)
        .bind(&input.category)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get(id)
            .await?
            .ok_or_else(|| StoreError::Database("just-inserted row not found".to_string()))
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<UrlMapping>> {
        let row = sqlx::query_as::<_, UrlMappingRow>("SELECT * FROM url_mappings WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(UrlMappingRow::into_entity).transpose()
    }

    /// Case-insensitive exact-match lookup, the one the dispatcher calls.
    /// A configuration may have more than one mapping for the same `url`
    /// (e.g. different extractor ensembles); when several match, the one
    /// with the highest `priority` wins, breaking further ties with the
    /// most recently created row (spec §4.8 step 1).
    pub async fn get_by_url(&self, url: &str) -> StoreResult<Option<UrlMapping>> {
        let row = sqlx::query_as::<_, UrlMappingRow>(
            r#"
            SELECT * FROM url_mappings
            WHERE LOWER(url) = LOWER(?) AND is_active = 1
            ORDER BY priority DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UrlMappingRow::into_entity).transpose()
    }

    pub async fn list(&self, active_only: bool) -> StoreResult<Vec<UrlMapping>> {
        let rows = if active_only {
            sqlx::query_as::<_, UrlMappingRow>(
                "SELECT * FROM url_mappings WHERE is_active = 1 ORDER BY updated_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, UrlMappingRow>("SELECT * FROM url_mappings ORDER BY updated_at DESC")
                .fetch_all(&self.pool)
                .await?
        };
        rows.into_iter().map(UrlMappingRow::into_entity).collect()
    }

    /// Mappings that route to a given configuration.
    pub async fn list_by_url_config(&self, url_config_id: Uuid) -> StoreResult<Vec<UrlMapping>> {
        let rows = sqlx::query_as::<_, UrlMappingRow>(
            "SELECT * FROM url_mappings WHERE url_config_id = ? ORDER BY updated_at DESC",
        )
        .bind(url_config_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UrlMappingRow::into_entity).collect()
    }

    /// Mappings that name `extractor_id` among their `extractor_ids`.
    /// LIKE-based full-scan over the JSON-text column; there's no index on
    /// this column since it holds a JSON array rather than a scalar.
    pub async fn list_by_extractor(&self, extractor_id: &str) -> StoreResult<Vec<UrlMapping>> {
        let pattern = format!("%\"{extractor_id}\"%");
        let rows = sqlx::query_as::<_, UrlMappingRow>(
            "SELECT * FROM url_mappings WHERE extractor_ids LIKE ? ORDER BY updated_at DESC",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UrlMappingRow::into_entity).collect()
    }

    /// Case-insensitive substring search over `url`, `notes`, `category`.
    pub async fn search(&self, query: &str) -> StoreResult<Vec<UrlMapping>> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, UrlMappingRow>(
            r#"
            SELECT * FROM url_mappings
            WHERE url LIKE ? COLLATE NOCASE
               OR notes LIKE ? COLLATE NOCASE
               OR category LIKE ? COLLATE NOCASE
            ORDER BY updated_at DESC
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(UrlMappingRow::into_entity).collect()
    }

    pub async fn stats(&self) -> StoreResult<UrlMappingStats> {
        let mappings = self.list(false).await?;
        let mut stats = UrlMappingStats {
            total: mappings.len() as i64,
            ..Default::default()
        };
        for mapping in &mappings {
            if mapping.is_active {
                stats.active += 1;
            }
            for extractor in &mapping.extractor_ids {
                *stats.by_extractor.entry(extractor.clone()).or_insert(0) += 1;
            }
            if let Some(category) = &mapping.category {
                *stats.by_category.entry(category.clone()).or_insert(0) += 1;
            }
        }
        Ok(stats)
    }

    pub async fn update(&self, id: Uuid, update: UrlMappingUpdate) -> StoreResult<UrlMapping> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("url_mapping {id}")))?;

        if let Some(ids) = &update.extractor_ids {
            if ids.is_empty() {
                return Err(StoreError::Validation(
                    "extractor_ids must contain at least one strategy name".to_string(),
                ));
            }
        }

        let merged = UrlMapping {
            url: update.url.unwrap_or(existing.url),
            extractor_ids: update.extractor_ids.unwrap_or(existing.extractor_ids),
            rate_limit: update.rate_limit.unwrap_or(existing.rate_limit),
            priority: update.priority.unwrap_or(existing.priority),
            crawler_settings: update.crawler_settings.unwrap_or(existing.crawler_settings),
            validation_rules: update.validation_rules.unwrap_or(existing.validation_rules),
            metadata: update.metadata.unwrap_or(existing.metadata),
            is_active: update.is_active.unwrap_or(existing.is_active),
            tags: update.tags.unwrap_or(existing.tags),
            notes: update.notes.or(existing.notes),
            category: update.category.or(existing.category),
            updated_at: Utc::now(),
            ..existing
        };

        sqlx::query(
            r#"
            UPDATE url_mappings SET
                url = ?, extractor_ids = ?, rate_limit = ?, priority = ?,
                crawler_settings = ?, validation_rules = ?, metadata = ?,
                is_active = ?, tags = ?, notes = ?, category = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&merged.url)
        .bind(serde_json::to_string(&merged.extractor_ids).unwrap_or_else(|_| "[]".to_string()))
        .bind(merged.rate_limit)
        .bind(merged.priority)
        .bind(serde_json::to_string(&merged.crawler_settings).unwrap_or_else(|_| "{}".to_string()))
        .bind(serde_json::to_string(&merged.validation_rules).unwrap_or_else(|_| "{}".to_string()))
        .bind(serde_json::to_string(&merged.metadata).unwrap_or_else(|_| "{}".to_string()))
        .bind(merged.is_active)
        .bind(serde_json::to_string(&merged.tags).unwrap_or_else(|_| "[]".to_string()))
        .bind(&merged.notes)
        .bind(&merged.category)
        .bind(merged.updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(merged)
    }

    /// Set `is_active` on up to 100 mappings at once. Returns the number of
    /// rows touched; ids that don't exist are silently skipped rather than
    /// failing the whole batch.
    pub async fn bulk_set_active(&self, ids: &[Uuid], is_active: bool) -> StoreResult<usize> {
        let mut updated = 0;
        let now = Utc::now().to_rfc3339();
        for id in ids {
            let result = sqlx::query(
                "UPDATE url_mappings SET is_active = ?, updated_at = ? WHERE id = ?",
            )
            .bind(is_active)
            .bind(&now)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
            updated += result.rows_affected() as usize;
        }
        Ok(updated)
    }

    /// Returns `false` rather than erroring on a second delete of the same
    /// id.
    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM url_mappings WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cascade delete: every mapping pointing at a configuration that was
    /// just deleted. Called by the API layer alongside
    /// `UrlConfigurationStore::delete` since the two stores may live in
    /// separate SQLite files and can't share a single transaction.
    pub async fn delete_by_url_config_id(&self, url_config_id: Uuid) -> StoreResult<usize> {
        let result = sqlx::query("DELETE FROM url_mappings WHERE url_config_id = ?")
            .bind(url_config_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(url_config_id: Uuid) -> NewUrlMapping {
        NewUrlMapping {
            url_config_id,
            url: "https://example.test/a".to_string(),
            extractor_ids: vec!["NewsLLMExtractionStrategy".to_string()],
            rate_limit: 60,
            priority: 1,
            crawler_settings: serde_json::json!({}),
            validation_rules: serde_json::json!({}),
            metadata: serde_json::json!({}),
            tags: vec![],
            notes: None,
            category: None,
        }
    }

    #[tokio::test]
    async fn create_then_lookup_by_url_case_insensitive() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let created = store.create(sample(Uuid::new_v4())).await.unwrap();
        let found = store
            .get_by_url(&created.url.to_uppercase())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.extractor_ids, vec!["NewsLLMExtractionStrategy"]);
    }

    #[tokio::test]
    async fn same_url_may_have_multiple_mappings() {
        // spec §3.2: a configuration may have multiple mappings for the
        // same url, e.g. different extractor ensembles.
        let store = UrlMappingStore::in_memory().await.unwrap();
        let config_id = Uuid::new_v4();
        store.create(sample(config_id)).await.unwrap();
        let second = store.create(sample(config_id)).await.unwrap();
        assert_eq!(second.url, "https://example.test/a");
        assert_eq!(store.list(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn get_by_url_breaks_ties_by_priority_then_created_at() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let config_id = Uuid::new_v4();

        let mut low = sample(config_id);
        low.priority = 1;
        low.extractor_ids = vec!["NewsLLMExtractionStrategy".to_string()];
        store.create(low).await.unwrap();

        let mut high = sample(config_id);
        high.priority = 10;
        high.extractor_ids = vec!["CryptoLLMExtractionStrategy".to_string()];
        let winner = store.create(high).await.unwrap();

        let found = store.get_by_url(&winner.url).await.unwrap().unwrap();
        assert_eq!(found.id, winner.id);
        assert_eq!(found.extractor_ids, vec!["CryptoLLMExtractionStrategy"]);
    }

    #[tokio::test]
    async fn empty_extractor_ids_rejected() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let mut input = sample(Uuid::new_v4());
        input.extractor_ids = vec![];
        let result = store.create(input).await;
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[tokio::test]
    async fn inactive_mapping_is_excluded_from_lookup() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let created = store.create(sample(Uuid::new_v4())).await.unwrap();
        store
            .update(
                created.id,
                UrlMappingUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(store.get_by_url(&created.url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_delete_returns_false_without_error() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let created = store.create(sample(Uuid::new_v4())).await.unwrap();
        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
    }

    #[tokio::test]
    async fn cascade_delete_by_url_config_id() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let config_id = Uuid::new_v4();
        store.create(sample(config_id)).await.unwrap();
        let deleted = store.delete_by_url_config_id(config_id).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.list(false).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn list_by_extractor_matches_member() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        store.create(sample(Uuid::new_v4())).await.unwrap();
        let found = store
            .list_by_extractor("NewsLLMExtractionStrategy")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(store
            .list_by_extractor("SomethingElse")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn bulk_set_active_updates_matching_rows() {
        let store = UrlMappingStore::in_memory().await.unwrap();
        let a = store.create(sample(Uuid::new_v4())).await.unwrap();
        let mut other = sample(Uuid::new_v4());
        other.url = "https://example.test/b".to_string();
        let b = store.create(other).await.unwrap();

        let updated = store.bulk_set_active(&[a.id, b.id], false).await.unwrap();
        assert_eq!(updated, 2);
        assert!(store.get(a.id).await.unwrap().unwrap().is_active == false);
    }
}
