//! Configuration System
//!
//! Layered configuration for the generation pipeline: merge-policy defaults,
//! the user's global config file, workspace config files, then `SENTINEL__*`
//! environment overrides. One [`SentinelConfig`] is built per process and
//! handed to the orchestrator; nothing reads configuration ambiently.

use crate::backend::{BackendProfile, CostModel, DEFAULT_CONTEXT_CHARS};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::{ConfigLoader, ENV_PREFIX};
pub use sources::global_file::global_config_path;

/// Key variable of the stock Anthropic backend
pub const CLAUDE_API_KEY_ENV: &str = "CLAUDE_API_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Generation backends by name. Iteration order is the backend order.
    #[serde(default)]
    pub backends: BTreeMap<String, BackendConfig>,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestration tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name similarity above which two records are duplicates
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,

    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,

    #[serde(default = "default_analysis_context_chars")]
    pub analysis_context_chars: usize,

    /// Per-file cap applied while building the context blob
    #[serde(default = "default_per_file_chars")]
    pub per_file_chars: usize,

    #[serde(default = "default_rate_limit_backoff_secs")]
    pub rate_limit_backoff_secs: u64,

    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,
}

fn default_dedup_threshold() -> f64 {
    crate::dedup::DEFAULT_SIMILARITY_THRESHOLD
}

fn default_backend_timeout_secs() -> u64 {
    180
}

fn default_analysis_timeout_secs() -> u64 {
    60
}

fn default_analysis_context_chars() -> usize {
    crate::analysis::DEFAULT_ANALYSIS_CONTEXT_CHARS
}

fn default_per_file_chars() -> usize {
    15_000
}

fn default_rate_limit_backoff_secs() -> u64 {
    10
}

fn default_max_rate_limit_retries() -> u32 {
    1
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: default_dedup_threshold(),
            backend_timeout_secs: default_backend_timeout_secs(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
            analysis_context_chars: default_analysis_context_chars(),
            per_file_chars: default_per_file_chars(),
            rate_limit_backoff_secs: default_rate_limit_backoff_secs(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
        }
    }
}

/// Manual-effort baseline for the savings metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// QA engineer cost, USD per hour
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,

    /// Tests a QA engineer writes per hour
    #[serde(default = "default_tests_per_hour")]
    pub tests_per_hour: f64,
}

fn default_hourly_rate() -> f64 {
    75.0
}

fn default_tests_per_hour() -> f64 {
    3.0
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hourly_rate: default_hourly_rate(),
            tests_per_hour: default_tests_per_hour(),
        }
    }
}

/// One generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub provider: ProviderConfig,

    #[serde(default)]
    pub profile: BackendProfile,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Context cap for this backend's prompt, in characters
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    #[serde(default)]
    pub cost: CostModel,
}

fn default_true() -> bool {
    true
}

fn default_context_chars() -> usize {
    DEFAULT_CONTEXT_CHARS
}

impl BackendConfig {
    pub fn new(provider: ProviderConfig, profile: BackendProfile) -> Self {
        Self {
            provider,
            profile,
            enabled: true,
            context_chars: DEFAULT_CONTEXT_CHARS,
            cost: CostModel::default(),
        }
    }
}

/// Architecture-summary phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Backend whose provider serves the summary request. None skips the
    /// request and streams the placeholder summary.
    #[serde(default)]
    pub backend: Option<String>,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Pipeline(String),
    Metrics(String),
    Backend(String, String),
    Analysis(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Pipeline(msg) => write!(f, "Pipeline: {}", msg),
            ValidationError::Metrics(msg) => write!(f, "Metrics: {}", msg),
            ValidationError::Backend(name, msg) => write!(f, "Backend '{}': {}", name, msg),
            ValidationError::Analysis(msg) => write!(f, "Analysis: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl PipelineConfig {
    fn validate(&self, errors: &mut Vec<ValidationError>) {
        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            errors.push(ValidationError::Pipeline(format!(
                "dedup_threshold must be in (0, 1], got {}",
                self.dedup_threshold
            )));
        }
        if self.backend_timeout_secs == 0 {
            errors.push(ValidationError::Pipeline(
                "backend_timeout_secs must be positive".to_string(),
            ));
        }
        if self.analysis_timeout_secs == 0 {
            errors.push(ValidationError::Pipeline(
                "analysis_timeout_secs must be positive".to_string(),
            ));
        }
        if self.per_file_chars == 0 {
            errors.push(ValidationError::Pipeline(
                "per_file_chars must be positive".to_string(),
            ));
        }
    }
}

impl MetricsConfig {
    fn validate(&self, errors: &mut Vec<ValidationError>) {
        if !(self.tests_per_hour > 0.0) {
            errors.push(ValidationError::Metrics(
                "tests_per_hour must be positive".to_string(),
            ));
        }
        if self.hourly_rate < 0.0 {
            errors.push(ValidationError::Metrics(
                "hourly_rate cannot be negative".to_string(),
            ));
        }
    }
}

impl BackendConfig {
    fn validate(&self, name: &str, errors: &mut Vec<ValidationError>) {
        if let Err(msg) = self.provider.validate() {
            errors.push(ValidationError::Backend(name.to_string(), msg));
        }
        if self.context_chars == 0 {
            errors.push(ValidationError::Backend(
                name.to_string(),
                "context_chars must be positive".to_string(),
            ));
        }
        let negative = match &self.cost {
            CostModel::PerToken {
                input_per_million,
                output_per_million,
            } => *input_per_million < 0.0 || *output_per_million < 0.0,
            CostModel::PerContextKchar { rate } => *rate < 0.0,
        };
        if negative {
            errors.push(ValidationError::Backend(
                name.to_string(),
                "cost rates cannot be negative".to_string(),
            ));
        }
    }
}

impl SentinelConfig {
    /// Validate the whole configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        self.pipeline.validate(&mut errors);
        self.metrics.validate(&mut errors);
        for (name, backend) in &self.backends {
            backend.validate(name, &mut errors);
        }
        if let Some(name) = &self.analysis.backend {
            if !self.backends.contains_key(name) {
                errors.push(ValidationError::Analysis(format!(
                    "backend '{}' is not configured",
                    name
                )));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in the stock deployment when no backend is configured: a Gemini
    /// architect backend (also serving the analysis phase) and an Anthropic
    /// security backend.
    pub fn with_default_backends(mut self) -> Self {
        if !self.backends.is_empty() {
            return self;
        }

        let mut gemini = BackendConfig::new(
            ProviderConfig::new(ProviderType::Gemini, "gemini-2.5-flash"),
            BackendProfile::Architect,
        );
        gemini.cost = CostModel::PerToken {
            input_per_million: 0.30,
            output_per_million: 2.50,
        };

        let mut claude = BackendConfig::new(
            ProviderConfig::new(ProviderType::Anthropic, "claude-3-5-sonnet-20241022"),
            BackendProfile::Security,
        );
        claude.provider.api_key_env = Some(CLAUDE_API_KEY_ENV.to_string());
        claude.cost = CostModel::PerContextKchar { rate: 0.003 };

        self.backends.insert("gemini".to_string(), gemini);
        self.backends.insert("claude".to_string(), claude);
        if self.analysis.backend.is_none() {
            self.analysis.backend = Some("gemini".to_string());
        }
        self
    }

    /// Enabled backends in configuration order.
    pub fn enabled_backends(&self) -> impl Iterator<Item = (&String, &BackendConfig)> {
        self.backends.iter().filter(|(_, backend)| backend.enabled)
    }
}
