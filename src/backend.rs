//! Generation backends
//!
//! A backend turns the context blob into draft test records. Backends never
//! fail with an error: every provider problem is captured in a
//! [`GenerationOutcome::Failed`] so one flaky provider cannot abort a run.

use crate::config::{BackendConfig, PipelineConfig};
use crate::context::truncate_chars;
use crate::error::{ApiError, BackendFailure};
use crate::provider::{
    ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient, ProviderFactory,
    TokenUsage,
};
use crate::record::TestCaseRecord;
use crate::repair::repair;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub mod prompts;

/// Default per-backend context cap, in characters.
pub const DEFAULT_CONTEXT_CHARS: usize = 50_000;

const ARCHITECT_DEFAULT_REASONING: &str = "Validated via logic density.";
const SECURITY_CATEGORY: &str = "Security";
const SECURITY_CONFIDENCE: f64 = 0.92;

/// Records produced by one successful backend call.
#[derive(Debug, Clone)]
pub struct GenerationBatch {
    pub backend: String,
    pub records: Vec<TestCaseRecord>,
    pub elapsed: Duration,
    /// Estimated spend in USD
    pub cost: f64,
}

impl GenerationBatch {
    pub fn empty(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            records: Vec::new(),
            elapsed: Duration::ZERO,
            cost: 0.0,
        }
    }
}

/// Result of one backend invocation.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Completed(GenerationBatch),
    Failed(BackendFailure),
}

impl GenerationOutcome {
    pub fn backend(&self) -> &str {
        match self {
            GenerationOutcome::Completed(batch) => &batch.backend,
            GenerationOutcome::Failed(failure) => &failure.backend,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, GenerationOutcome::Failed(_))
    }
}

/// One source of generated test records
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Generate drafts for `context`. Empty context yields an empty batch.
    async fn generate(&self, context: &str) -> GenerationOutcome;
}

/// Prompt and post-processing flavour of a provider-backed backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProfile {
    /// Broad functional coverage with runnable code
    #[default]
    Architect,
    /// Security and edge-case scenarios
    Security,
}

impl BackendProfile {
    pub fn template(self) -> &'static str {
        match self {
            BackendProfile::Architect => prompts::ARCHITECT_TEMPLATE,
            BackendProfile::Security => prompts::SECURITY_TEMPLATE,
        }
    }

    pub fn completion_options(self) -> CompletionOptions {
        let (temperature, max_tokens) = match self {
            BackendProfile::Architect => (0.1, 8192),
            BackendProfile::Security => (0.3, 4096),
        };
        CompletionOptions {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            json_response: true,
        }
    }

    /// Apply the profile's fixed fields to a decoded record.
    pub fn finish(self, record: &mut TestCaseRecord) {
        match self {
            BackendProfile::Architect => {
                if record.reasoning.is_none() {
                    record.reasoning = Some(ARCHITECT_DEFAULT_REASONING.to_string());
                }
            }
            BackendProfile::Security => {
                record.category = SECURITY_CATEGORY.to_string();
                record.confidence = SECURITY_CONFIDENCE;
            }
        }
    }
}

/// How a backend's spend is estimated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostModel {
    /// USD per million input and output tokens
    PerToken {
        input_per_million: f64,
        output_per_million: f64,
    },
    /// USD per thousand characters of context sent
    PerContextKchar { rate: f64 },
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::PerToken {
            input_per_million: 0.0,
            output_per_million: 0.0,
        }
    }
}

impl CostModel {
    pub fn estimate(&self, usage: &TokenUsage, context_chars: usize) -> f64 {
        match self {
            CostModel::PerToken {
                input_per_million,
                output_per_million,
            } => {
                usage.prompt_tokens as f64 / 1_000_000.0 * input_per_million
                    + usage.completion_tokens as f64 / 1_000_000.0 * output_per_million
            }
            CostModel::PerContextKchar { rate } => context_chars as f64 / 1000.0 * rate,
        }
    }
}

/// Rate-limit retry settings
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub backoff: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::from_secs(10),
            max_retries: 1,
        }
    }
}

/// Backend backed by a model provider client.
pub struct ProviderBackend {
    name: String,
    client: Box<dyn ModelProviderClient>,
    profile: BackendProfile,
    context_chars: usize,
    cost_model: CostModel,
    retry: RetryPolicy,
}

impl ProviderBackend {
    pub fn new(
        name: impl Into<String>,
        client: Box<dyn ModelProviderClient>,
        profile: BackendProfile,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            profile,
            context_chars: DEFAULT_CONTEXT_CHARS,
            cost_model: CostModel::default(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build from configuration. Fails when the provider cannot be created,
    /// typically because no API key is available.
    pub fn from_config(
        name: &str,
        config: &BackendConfig,
        pipeline: &PipelineConfig,
    ) -> Result<Self, ApiError> {
        let client = ProviderFactory::create_client(&config.provider)?;
        Ok(Self::new(name, client, config.profile)
            .with_context_chars(config.context_chars)
            .with_cost_model(config.cost.clone())
            .with_retry(RetryPolicy {
                backoff: Duration::from_secs(pipeline.rate_limit_backoff_secs),
                max_retries: pipeline.max_rate_limit_retries,
            }))
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn with_cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provenance(&self) -> String {
        format!("{} ({})", self.name, self.client.model_name())
    }

    async fn complete_with_retry(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<CompletionResponse, ApiError> {
        let options = self.profile.completion_options();
        let mut retries = 0;
        loop {
            match self.client.complete(messages.clone(), options.clone()).await {
                Err(err) if err.is_rate_limit() && retries < self.retry.max_retries => {
                    retries += 1;
                    warn!(
                        backend = %self.name,
                        retry = retries,
                        backoff_secs = self.retry.backoff.as_secs(),
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                }
                result => return result,
            }
        }
    }

    fn decode(&self, raw: &str) -> Vec<TestCaseRecord> {
        let provenance = self.provenance();
        repair(raw)
            .iter()
            .filter_map(|draft| TestCaseRecord::from_draft(draft, &provenance))
            .map(|mut record| {
                self.profile.finish(&mut record);
                record
            })
            .collect()
    }
}

#[async_trait]
impl GenerationBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, context: &str) -> GenerationOutcome {
        if context.trim().is_empty() {
            return GenerationOutcome::Completed(GenerationBatch::empty(&self.name));
        }
        let start = Instant::now();
        let context = truncate_chars(context, self.context_chars);
        let prompt = prompts::render(self.profile.template(), context);
        debug!(backend = %self.name, prompt_chars = prompt.len(), "sending generation request");

        match self.complete_with_retry(vec![ChatMessage::user(prompt)]).await {
            Ok(response) => {
                let records = self.decode(&response.content);
                let elapsed = start.elapsed();
                let cost = self
                    .cost_model
                    .estimate(&response.usage, context.chars().count());
                info!(
                    backend = %self.name,
                    records = records.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    cost,
                    "backend completed"
                );
                GenerationOutcome::Completed(GenerationBatch {
                    backend: self.name.clone(),
                    records,
                    elapsed,
                    cost,
                })
            }
            Err(err) => {
                warn!(backend = %self.name, error = %err, "backend failed");
                GenerationOutcome::Failed(BackendFailure::from_api_error(&self.name, &err))
            }
        }
    }
}
