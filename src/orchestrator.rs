//! Pipeline orchestration
//!
//! One run walks a one-directional state machine:
//! `Idle → AnalyzingArchitecture → GeneratingTests → (Degraded) → Merging → Done`.
//! Backends are fanned out concurrently and joined before merging; every
//! backend problem is contained as a failed outcome. Only a pipeline fault
//! reaches the caller, as a single `error` event.

use crate::analysis::{ArchitectureAnalyzer, ArchitectureSummary, ProviderAnalyzer};
use crate::backend::{GenerationBackend, GenerationOutcome, ProviderBackend};
use crate::config::SentinelConfig;
use crate::coverage::GapAnalyzer;
use crate::dedup::{deduplicate, DEFAULT_SIMILARITY_THRESHOLD};
use crate::error::{ApiError, BackendFailure, FailureKind};
use crate::fallback::fallback;
use crate::metrics::{CostBreakdown, MetricsCalculator};
use crate::progress::{channel, EventSink, ProgressEvent, ProgressStream, TestResultsData};
use crate::provider::ProviderFactory;
use crate::rank::rank;
use crate::record::TestCaseRecord;
use crate::sanitize::sanitize_record;
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const STATUS_SCANNING: &str = "Scanning architecture...";
pub const STATUS_DESIGNING: &str = "Designing test scenarios...";
pub const STATUS_FORMATTING: &str = "Formatting results...";
pub const STATUS_FALLBACK: &str = "No backend produced usable records. Engaging fallback generator...";
pub const STATUS_DONE: &str = "Done!";

const EVENT_BUFFER: usize = 16;

/// Stage of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Idle,
    AnalyzingArchitecture,
    GeneratingTests,
    Degraded,
    Merging,
    Done,
}

impl PipelineState {
    /// Transitions only move forward; `Degraded` is reachable only from
    /// `GeneratingTests`, and `Merging` only from there or `Degraded`.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, AnalyzingArchitecture)
                | (AnalyzingArchitecture, GeneratingTests)
                | (GeneratingTests, Degraded)
                | (GeneratingTests, Merging)
                | (Degraded, Merging)
                | (Merging, Done)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::AnalyzingArchitecture => "analyzing_architecture",
            PipelineState::GeneratingTests => "generating_tests",
            PipelineState::Degraded => "degraded",
            PipelineState::Merging => "merging",
            PipelineState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Per-run state owned by the pipeline task.
struct RunState {
    state: PipelineState,
    started: Instant,
}

impl RunState {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: PipelineState) -> Result<(), ApiError> {
        if !self.state.can_advance_to(next) {
            return Err(ApiError::PipelineFault(format!(
                "invalid transition {} -> {}",
                self.state, next
            )));
        }
        debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
        Ok(())
    }
}

/// Knobs of one orchestrator
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub dedup_threshold: f64,
    pub backend_timeout: Duration,
    pub analysis_timeout: Duration,
    pub metrics: MetricsCalculator,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dedup_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            backend_timeout: Duration::from_secs(180),
            analysis_timeout: Duration::from_secs(60),
            metrics: MetricsCalculator::default(),
        }
    }
}

impl From<&SentinelConfig> for PipelineSettings {
    fn from(config: &SentinelConfig) -> Self {
        Self {
            dedup_threshold: config.pipeline.dedup_threshold,
            backend_timeout: Duration::from_secs(config.pipeline.backend_timeout_secs),
            analysis_timeout: Duration::from_secs(config.pipeline.analysis_timeout_secs),
            metrics: MetricsCalculator::from(&config.metrics),
        }
    }
}

/// Records merged from all outcomes, before dedupe and ranking.
struct Collected {
    records: Vec<TestCaseRecord>,
    models_used: Vec<String>,
    costs: CostBreakdown,
    failures: Vec<BackendFailure>,
}

/// Coordinates the backends of one deployment. Cheap to share; each call to
/// [`Orchestrator::run`] is an independent run.
pub struct Orchestrator {
    backends: Vec<Arc<dyn GenerationBackend>>,
    analyzer: Option<Arc<dyn ArchitectureAnalyzer>>,
    settings: PipelineSettings,
    gaps: GapAnalyzer,
}

impl Orchestrator {
    pub fn new(
        backends: Vec<Arc<dyn GenerationBackend>>,
        analyzer: Option<Arc<dyn ArchitectureAnalyzer>>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            backends,
            analyzer,
            settings,
            gaps: GapAnalyzer,
        }
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Build the configured deployment. Enabled backends whose provider
    /// cannot be created (usually a missing API key) are skipped with a
    /// warning; the run degrades to the fallback batch if none remain.
    pub fn from_config(config: &SentinelConfig) -> Self {
        let mut builder = Self::builder().settings(PipelineSettings::from(config));

        for (name, backend_config) in config.enabled_backends() {
            match ProviderBackend::from_config(name, backend_config, &config.pipeline) {
                Ok(backend) => {
                    info!(backend = %name, model = %backend_config.provider.model, "backend enabled");
                    builder = builder.backend(Arc::new(backend));
                }
                Err(err) => warn!(backend = %name, error = %err, "backend disabled"),
            }
        }

        let analysis_provider = config
            .analysis
            .backend
            .as_ref()
            .and_then(|name| config.backends.get(name));
        if let Some(backend_config) = analysis_provider {
            match ProviderFactory::create_client(&backend_config.provider) {
                Ok(client) => {
                    let analyzer = ProviderAnalyzer::new(client)
                        .with_context_chars(config.pipeline.analysis_context_chars);
                    builder = builder.analyzer(Arc::new(analyzer));
                }
                Err(err) => warn!(error = %err, "architecture analysis disabled"),
            }
        }

        builder.build()
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Start a run over `context` and return its event stream. The run
    /// executes on its own task; dropping the stream cancels it.
    pub fn run(self: &Arc<Self>, context: impl Into<String>) -> ProgressStream {
        let (sink, rx) = channel(EVENT_BUFFER);
        let orchestrator = Arc::clone(self);
        let context = context.into();

        let task = tokio::spawn(async move {
            supervise(orchestrator.drive(&context, &sink), &sink).await;
        });

        ProgressStream::new(rx, task)
    }

    async fn drive(&self, context: &str, sink: &EventSink) -> Result<(), ApiError> {
        let mut run = RunState::new();

        run.advance(PipelineState::AnalyzingArchitecture)?;
        sink.emit(ProgressEvent::status(STATUS_SCANNING)).await?;
        let summary = sink.guard(self.analyze(context)).await?;
        sink.emit(ProgressEvent::AnalysisResult { data: summary }).await?;

        run.advance(PipelineState::GeneratingTests)?;
        sink.emit(ProgressEvent::status(STATUS_DESIGNING)).await?;
        let outcomes = sink.guard(self.generate_all(context)).await?;
        sink.emit(ProgressEvent::status(STATUS_FORMATTING)).await?;

        let mut collected = collect(outcomes);
        let degraded = collected.records.is_empty();
        if degraded {
            run.advance(PipelineState::Degraded)?;
            warn!(
                failures = collected.failures.len(),
                "no usable records; substituting fallback batch"
            );
            sink.emit(ProgressEvent::status(STATUS_FALLBACK)).await?;
            collected.records = fallback();
        }

        run.advance(PipelineState::Merging)?;
        let data = self.merge(collected, context, degraded, run.started.elapsed());
        info!(
            records = data.total,
            duplicates = data.duplicates_removed,
            degraded,
            "pipeline merged"
        );
        sink.emit(ProgressEvent::TestResults { data }).await?;

        run.advance(PipelineState::Done)?;
        sink.emit(ProgressEvent::status(STATUS_DONE)).await?;
        Ok(())
    }

    /// Architecture summary, degrading to the placeholder on any failure.
    async fn analyze(&self, context: &str) -> ArchitectureSummary {
        let Some(analyzer) = &self.analyzer else {
            return ArchitectureSummary::placeholder();
        };
        let call = AssertUnwindSafe(analyzer.analyze(context)).catch_unwind();
        match tokio::time::timeout(self.settings.analysis_timeout, call).await {
            Ok(Ok(Ok(summary))) => summary,
            Ok(Ok(Err(err))) => {
                warn!(error = %err, "architecture analysis failed; using placeholder");
                ArchitectureSummary::placeholder()
            }
            Ok(Err(panic)) => {
                warn!(
                    panic = %panic_message(panic.as_ref()),
                    "architecture analysis panicked; using placeholder"
                );
                ArchitectureSummary::placeholder()
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.settings.analysis_timeout.as_secs(),
                    "architecture analysis timed out; using placeholder"
                );
                ArchitectureSummary::placeholder()
            }
        }
    }

    /// Invoke every backend concurrently and wait for all of them. Outcomes
    /// come back in backend order regardless of completion order.
    async fn generate_all(&self, context: &str) -> Vec<GenerationOutcome> {
        let timeout = self.settings.backend_timeout;
        let calls = self.backends.iter().map(|backend| async move {
            let call = AssertUnwindSafe(backend.generate(context)).catch_unwind();
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(panic)) => GenerationOutcome::Failed(BackendFailure::new(
                    backend.name(),
                    FailureKind::Panicked,
                    panic_message(panic.as_ref()),
                )),
                Err(_) => GenerationOutcome::Failed(BackendFailure::new(
                    backend.name(),
                    FailureKind::Timeout,
                    format!("no response within {}s", timeout.as_secs()),
                )),
            }
        });
        join_all(calls).await
    }

    fn merge(
        &self,
        collected: Collected,
        context: &str,
        degraded: bool,
        elapsed: Duration,
    ) -> TestResultsData {
        let total_generated = collected.records.len();
        let (unique, duplicates_removed) =
            deduplicate(collected.records, self.settings.dedup_threshold);
        let test_cases = rank(unique);

        let metrics = self
            .settings
            .metrics
            .calculate(test_cases.len(), collected.costs, elapsed);
        let coverage = self.gaps.analyze(&test_cases, context);

        TestResultsData {
            total: test_cases.len(),
            test_cases,
            metrics,
            coverage,
            models_used: collected.models_used,
            duplicates_removed,
            total_generated,
            degraded,
        }
    }
}

/// Drive one run to completion. A fault or panic becomes a single `error`
/// event; a cancelled run ends silently.
async fn supervise<F>(run: F, sink: &EventSink)
where
    F: Future<Output = Result<(), ApiError>>,
{
    let message = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(())) => return,
        Ok(Err(ApiError::Cancelled)) => {
            debug!("consumer went away; run abandoned");
            return;
        }
        Ok(Err(err)) => err.to_string(),
        Err(panic) => format!("Pipeline fault: {}", panic_message(panic.as_ref())),
    };
    error!(error = %message, "pipeline aborted");
    let _ = sink.emit(ProgressEvent::error(message)).await;
}

/// Sanitize and pool the records of every completed outcome.
fn collect(outcomes: Vec<GenerationOutcome>) -> Collected {
    let mut collected = Collected {
        records: Vec::new(),
        models_used: Vec::new(),
        costs: CostBreakdown::default(),
        failures: Vec::new(),
    };
    for outcome in outcomes {
        match outcome {
            GenerationOutcome::Completed(batch) => {
                collected.costs.add(&batch.backend, batch.cost);
                collected.models_used.push(batch.backend);
                collected
                    .records
                    .extend(batch.records.into_iter().map(|mut record| {
                        sanitize_record(&mut record);
                        record
                    }));
            }
            GenerationOutcome::Failed(failure) => {
                warn!(backend = %failure.backend, kind = ?failure.kind, "{}", failure.message);
                collected.failures.push(failure);
            }
        }
    }
    collected
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Assembles an [`Orchestrator`].
#[derive(Default)]
pub struct OrchestratorBuilder {
    backends: Vec<Arc<dyn GenerationBackend>>,
    analyzer: Option<Arc<dyn ArchitectureAnalyzer>>,
    settings: PipelineSettings,
}

impl OrchestratorBuilder {
    pub fn backend(mut self, backend: Arc<dyn GenerationBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn analyzer(mut self, analyzer: Arc<dyn ArchitectureAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator::new(self.backends, self.analyzer, self.settings)
    }
}
