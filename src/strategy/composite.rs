//! Composite (parallel fan-out) combinator.
//!
//! Classifies the content, selects sub-strategies whose category
//! confidence clears a threshold (falling back to every sub-strategy when
//! nothing clears it), runs the selected sub-strategies concurrently, and
//! merges their results. Per-substrategy failures are isolated — one
//! failing sub-strategy never fails the whole composite; each sub-call is
//! wrapped so its error becomes part of the result tuple rather than
//! propagating through `join_all`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::classifier::ContentClassifier;
use crate::error::{StrategyError, StrategyResult};
use crate::types::Category;

use super::{ExtractOpts, ExtractionMeta, ExtractionRecord, Strategy};

const SELECTION_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    Union,
    Intersection,
    Smart,
}

/// Ordered field-ownership table used by [`MergeMode::Smart`]: fields named
/// here are filled from the highest-confidence sub-strategy that declares
/// them. Declared per sub-strategy name by the composite's constructor,
/// rather than per-category, since a composite may mix strategies outside
/// the fixed six built-in categories.
pub type PriorityFields = HashMap<String, Vec<String>>;

pub struct CompositeStrategy {
    name: String,
    sub_strategies: Vec<Arc<dyn Strategy>>,
    merge_mode: MergeMode,
    priority_fields: PriorityFields,
    max_parallel: usize,
}

impl CompositeStrategy {
    pub fn new(name: impl Into<String>, sub_strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            name: name.into(),
            sub_strategies,
            merge_mode: MergeMode::Smart,
            priority_fields: HashMap::new(),
            max_parallel: 6,
        }
    }

    pub fn with_merge_mode(mut self, mode: MergeMode) -> Self {
        self.merge_mode = mode;
        self
    }

    pub fn with_priority_fields(mut self, fields: PriorityFields) -> Self {
        self.priority_fields = fields;
        self
    }

    /// Caps how many sub-strategies run concurrently per call. Defaults to
    /// 6, matching the fixed six-category default strategy list.
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    fn select<'a>(&'a self, classification: &crate::classifier::Classification) -> Vec<&'a Arc<dyn Strategy>> {
        if classification.matched_categories.is_empty() {
            return self.sub_strategies.iter().collect();
        }

        let selected_categories = classification.above_threshold(SELECTION_THRESHOLD);

        let mut picked: Vec<&Arc<dyn Strategy>> = self
            .sub_strategies
            .iter()
            .filter(|s| selected_categories.contains(&s.category()))
            .collect();

        if picked.is_empty() {
            // Fall back to the top-2 matched categories when the threshold
            // filter empties the selection entirely.
            let top2: Vec<Category> = classification.matched_categories.iter().take(2).copied().collect();
            picked = self
                .sub_strategies
                .iter()
                .filter(|s| top2.contains(&s.category()))
                .collect();
        }

        if picked.is_empty() {
            picked = self.sub_strategies.iter().collect();
        }
        picked
    }

    fn merge(&self, results: Vec<ExtractionRecord>) -> Value {
        match results.len() {
            0 => return serde_json::json!({}),
            1 => return results.into_iter().next().unwrap().data,
            _ => {}
        }

        match self.merge_mode {
            MergeMode::Union => merge_union(&results),
            MergeMode::Intersection => merge_intersection(&results),
            MergeMode::Smart => merge_smart(&results, &self.priority_fields),
        }
    }
}

fn merge_union(results: &[ExtractionRecord]) -> Value {
    let mut merged = serde_json::Map::new();
    for record in results {
        if let Value::Object(map) = &record.data {
            for (key, value) in map {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
    }
    Value::Object(merged)
}

fn merge_intersection(results: &[ExtractionRecord]) -> Value {
    let Some(Value::Object(first)) = results.first().map(|r| &r.data) else {
        return serde_json::json!({});
    };
    let mut common_keys: Vec<String> = first.keys().cloned().collect();
    for record in &results[1..] {
        if let Value::Object(map) = &record.data {
            common_keys.retain(|k| map.contains_key(k));
        } else {
            common_keys.clear();
        }
    }
    let mut merged = serde_json::Map::new();
    for key in common_keys {
        if let Some(value) = first.get(&key) {
            merged.insert(key, value.clone());
        }
    }
    Value::Object(merged)
}

/// Dict fields recursively merge; list fields merge de-duplicated
/// preserving first-seen order; scalars and everything else are filled by
/// whichever sub-strategy is named in `priority_fields` for that key first,
/// then by plain left-to-right union for anything not in the table.
fn merge_smart(results: &[ExtractionRecord], priority_fields: &PriorityFields) -> Value {
    let mut merged = serde_json::Map::new();

    for field_name_owner in priority_fields {
        let (owner_strategy, fields) = field_name_owner;
        if let Some(record) = results.iter().find(|r| &r.meta.strategy == owner_strategy) {
            if let Value::Object(map) = &record.data {
                for field in fields {
                    if let Some(value) = map.get(field) {
                        merged.entry(field.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }
    }

    for record in results {
        let Value::Object(map) = &record.data else {
            continue;
        };
        for (key, value) in map {
            match merged.get(key) {
                None => {
                    merged.insert(key.clone(), value.clone());
                }
                Some(existing) => {
                    if let (Value::Object(e), Value::Object(v)) = (existing.clone(), value) {
                        let mut e = e;
                        for (k, vv) in v {
                            e.entry(k.clone()).or_insert_with(|| vv.clone());
                        }
                        merged.insert(key.clone(), Value::Object(e));
                    } else if let (Value::Array(e), Value::Array(v)) = (existing.clone(), value) {
                        let mut combined = e;
                        for item in v {
                            if !combined.contains(item) {
                                combined.push(item.clone());
                            }
                        }
                        merged.insert(key.clone(), Value::Array(combined));
                    }
                    // scalar conflicts: first-seen (by priority_fields or
                    // first result) wins, preferring a non-empty existing
                    // value over overwriting it.
                }
            }
        }
    }

    Value::Object(merged)
}

#[async_trait]
impl Strategy for CompositeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        url: &str,
        content: &str,
        opts: &ExtractOpts,
    ) -> StrategyResult<ExtractionRecord> {
        let classification = ContentClassifier::classify(content);
        let selected = self.select(&classification);
        let selected: Vec<&Arc<dyn Strategy>> = selected.into_iter().take(self.max_parallel.max(1)).collect();

        let futures = selected.iter().map(|strategy| {
            let strategy = Arc::clone(strategy);
            let url = url.to_string();
            let content = content.to_string();
            let opts = opts.clone();
            async move { strategy.extract(&url, &content, &opts).await }
        });

        let outcomes = join_all(futures).await;

        let mut results = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(record) => results.push(record),
                Err(e) => errors.push(e.to_string()),
            }
        }

        if results.is_empty() {
            // An aggregated `ContentParsing` failure, not `Configuration`
            // — every sub-strategy failing is a data problem (nothing
            // extractable), not a setup problem.
            return Err(StrategyError::ContentParsing(format!(
                "all {} sub-strategies failed: {}",
                errors.len(),
                errors.join("; ")
            )));
        }

        let successful_strategies: Vec<String> = results.iter().map(|r| r.meta.strategy.clone()).collect();
        let data = self.merge(results);

        let mut meta = ExtractionMeta::new(self.name.clone(), url);
        meta.content_types = classification
            .matched_categories
            .iter()
            .map(Category::to_string)
            .collect();
        meta.confidence_scores = classification
            .confidence
            .iter()
            .map(|(c, v)| (c.to_string(), *v))
            .collect();
        meta.strategies_used = successful_strategies.clone();
        meta.successful_strategies = successful_strategies;
        meta.failed_strategies = errors.len();

        Ok(ExtractionRecord::new(data, meta))
    }
}
