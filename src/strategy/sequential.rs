//! Sequential (ordered pipeline) combinator.
//!
//! Strategies run in declared order, each one (when `pass_results` is set)
//! seeing the fields accumulated so far via [`super::ExtractOpts`]'s
//! `previous_results`. A step's failure is logged and skipped rather than
//! aborting the whole pipeline.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StrategyError, StrategyResult};

use super::{ExtractOpts, ExtractionMeta, ExtractionRecord, Strategy, StepMeta};

pub struct SequentialStrategy {
    name: String,
    steps: Vec<std::sync::Arc<dyn Strategy>>,
    pass_results: bool,
}

impl SequentialStrategy {
    pub fn new(name: impl Into<String>, steps: Vec<std::sync::Arc<dyn Strategy>>) -> Self {
        Self {
            name: name.into(),
            steps,
            pass_results: true,
        }
    }

    pub fn with_pass_results(mut self, pass_results: bool) -> Self {
        self.pass_results = pass_results;
        self
    }
}

/// Merge one step's output into the running accumulator. Scalar conflicts
/// resolve to the later step's value; dicts merge recursively; lists
/// append new, not-yet-seen items.
fn merge_step(accumulator: &mut serde_json::Map<String, Value>, step_result: &Value) -> Vec<String> {
    let mut fields_added = Vec::new();
    let Value::Object(map) = step_result else {
        return fields_added;
    };
    for (key, value) in map {
        match accumulator.get(key) {
            None => {
                accumulator.insert(key.clone(), value.clone());
                fields_added.push(key.clone());
            }
            Some(existing) => {
                if let (Value::Object(mut e), Value::Object(v)) = (existing.clone(), value.clone()) {
                    for (k, vv) in v {
                        e.insert(k, vv);
                    }
                    accumulator.insert(key.clone(), Value::Object(e));
                } else if let (Value::Array(mut e), Value::Array(v)) = (existing.clone(), value.clone()) {
                    for item in v {
                        if !e.contains(&item) {
                            e.push(item);
                        }
                    }
                    accumulator.insert(key.clone(), Value::Array(e));
                } else {
                    // later step wins on scalar conflicts
                    accumulator.insert(key.clone(), value.clone());
                }
                fields_added.push(key.clone());
            }
        }
    }
    fields_added
}

#[async_trait]
impl Strategy for SequentialStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(
        &self,
        url: &str,
        content: &str,
        opts: &ExtractOpts,
    ) -> StrategyResult<ExtractionRecord> {
        let mut accumulator = serde_json::Map::new();
        let mut step_metas = Vec::new();
        let mut errors = Vec::new();

        for (i, step) in self.steps.iter().enumerate() {
            let mut step_opts = opts.clone();
            if self.pass_results && !accumulator.is_empty() && i > 0 {
                step_opts.previous_results = Some(Value::Object(accumulator.clone()));
            }

            match step.extract(url, content, &step_opts).await {
                Ok(record) => {
                    let fields_added = merge_step(&mut accumulator, &record.data);
                    step_metas.push(StepMeta {
                        strategy: step.name().to_string(),
                        step_index: i,
                        fields_added,
                    });
                }
                Err(e) => {
                    tracing::warn!(strategy = %step.name(), step_index = i, error = %e, "sequential step failed, continuing");
                    errors.push(format!("{}: {e}", step.name()));
                }
            }
        }

        if accumulator.is_empty() && !errors.is_empty() {
            // Every step failing is a data problem (nothing extractable),
            // not a setup problem — same reasoning as the composite
            // combinator's all-sub-strategies-failed case.
            return Err(StrategyError::ContentParsing(format!(
                "all sequential steps failed: {}",
                errors.join("; ")
            )));
        }

        let mut meta = ExtractionMeta::new(self.name.clone(), url);
        meta.steps = step_metas;
        meta.failed_strategies = errors.len();
        Ok(ExtractionRecord::new(Value::Object(accumulator), meta))
    }
}
