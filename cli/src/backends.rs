// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Deterministic in-process backends for the built-in task handlers.
//!
//! No model is called: `generate` echoes the prompt, `analyze` returns text
//! statistics and `search` matches the query against an optional `corpus`
//! param. Tools: `clock/now`, `echo/*` and `math/sum`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use hive_core::application::handlers::{InferenceBackend, ToolExecutor};
use hive_core::domain::handler::{required_value, TaskHandlerError};
use hive_core::domain::task::TaskParams;

fn bag(value: Value) -> TaskParams {
    match value {
        Value::Object(map) => map,
        _ => TaskParams::new(),
    }
}

#[derive(Debug, Default, Clone)]
pub struct LocalInference;

#[async_trait]
impl InferenceBackend for LocalInference {
    async fn generate(&self, prompt: &str, params: &TaskParams) -> Result<TaskParams, TaskHandlerError> {
        let max_chars = params
            .get("maxChars")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(usize::MAX);
        let text: String = prompt.chars().take(max_chars).collect();
        Ok(bag(json!({ "text": text, "model": "local-echo" })))
    }

    async fn analyze(&self, text: &str, _params: &TaskParams) -> Result<TaskParams, TaskHandlerError> {
        Ok(bag(json!({
            "characters": text.chars().count(),
            "words": text.split_whitespace().count(),
            "lines": text.lines().count(),
        })))
    }

    async fn search(&self, query: &str, params: &TaskParams) -> Result<TaskParams, TaskHandlerError> {
        let needle = query.to_lowercase();
        let results: Vec<Value> = params
            .get("corpus")
            .and_then(Value::as_array)
            .map(|docs| {
                docs.iter()
                    .filter_map(Value::as_str)
                    .filter(|doc| doc.to_lowercase().contains(&needle))
                    .map(|doc| Value::String(doc.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(bag(json!({ "query": query, "results": results })))
    }
}

#[derive(Debug, Default, Clone)]
pub struct LocalTools;

#[async_trait]
impl ToolExecutor for LocalTools {
    async fn execute(
        &self,
        tool_type: &str,
        operation: &str,
        params: &TaskParams,
    ) -> Result<TaskParams, TaskHandlerError> {
        match (tool_type, operation) {
            ("clock", "now") => Ok(bag(json!({ "now": Utc::now().to_rfc3339() }))),
            ("echo", _) => Ok(params.clone()),
            ("math", "sum") => {
                let values = required_value(params, "values")?
                    .as_array()
                    .ok_or_else(|| TaskHandlerError::InvalidParam {
                        name: "values".to_string(),
                        reason: "expected an array of numbers".to_string(),
                    })?;
                let mut sum = 0.0;
                for value in values {
                    sum += value.as_f64().ok_or_else(|| TaskHandlerError::InvalidParam {
                        name: "values".to_string(),
                        reason: format!("{value} is not a number"),
                    })?;
                }
                Ok(bag(json!({ "sum": sum })))
            }
            _ => Err(TaskHandlerError::Backend(format!(
                "unsupported tool operation {tool_type}/{operation}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_analyze_counts() {
        let out = LocalInference
            .analyze("two words\nand more", &TaskParams::new())
            .await
            .unwrap();
        assert_eq!(out["words"], 4);
        assert_eq!(out["lines"], 2);
    }

    #[tokio::test]
    async fn test_search_filters_corpus() {
        let params = bag(json!({ "corpus": ["Rust async", "Go channels", "rust macros"] }));
        let out = LocalInference.search("RUST", &params).await.unwrap();
        assert_eq!(out["results"], json!(["Rust async", "rust macros"]));
    }

    #[tokio::test]
    async fn test_math_sum() {
        let params = bag(json!({ "values": [1, 2.5, 3] }));
        let out = LocalTools.execute("math", "sum", &params).await.unwrap();
        assert_eq!(out["sum"], 6.5);

        let bad = bag(json!({ "values": [1, "x"] }));
        assert!(matches!(
            LocalTools.execute("math", "sum", &bad).await,
            Err(TaskHandlerError::InvalidParam { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        assert!(matches!(
            LocalTools.execute("laser", "fire", &TaskParams::new()).await,
            Err(TaskHandlerError::Backend(_))
        ));
    }
}
