//! Shared test utilities for integration tests
//!
//! Scripted generation backends for driving the orchestrator without network
//! access, and environment isolation for configuration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use sentinel::analysis::{ArchitectureAnalyzer, ArchitectureSummary};
use sentinel::backend::{GenerationBackend, GenerationBatch, GenerationOutcome};
use sentinel::error::{ApiError, BackendFailure, FailureKind};
use sentinel::record::{Priority, TestCaseRecord};
use sentinel::repair::repair;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// What a scripted backend does when invoked
pub enum Behavior {
    /// Decode this raw model text the way a provider backend would
    Raw(String),
    Records(Vec<TestCaseRecord>),
    Fail(FailureKind),
    Panic,
    Hang,
}

pub struct ScriptedBackend {
    name: String,
    behavior: Behavior,
    delay: Duration,
    cost: f64,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            delay: Duration::ZERO,
            cost: 0.0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _context: &str) -> GenerationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let records = match &self.behavior {
            Behavior::Raw(text) => repair(text)
                .iter()
                .filter_map(|draft| TestCaseRecord::from_draft(draft, &self.name))
                .collect(),
            Behavior::Records(records) => records.clone(),
            Behavior::Fail(kind) => {
                return GenerationOutcome::Failed(BackendFailure::new(
                    &self.name,
                    *kind,
                    "scripted failure",
                ))
            }
            Behavior::Panic => panic!("scripted panic in {}", self.name),
            Behavior::Hang => {
                futures::future::pending::<()>().await;
                Vec::new()
            }
        };

        GenerationOutcome::Completed(GenerationBatch {
            backend: self.name.clone(),
            records,
            elapsed: self.delay,
            cost: self.cost,
        })
    }
}

/// Analyzer returning a fixed summary, or failing
pub struct ScriptedAnalyzer(pub Option<ArchitectureSummary>);

#[async_trait]
impl ArchitectureAnalyzer for ScriptedAnalyzer {
    async fn analyze(&self, _context: &str) -> Result<ArchitectureSummary, ApiError> {
        self.0
            .clone()
            .ok_or_else(|| ApiError::ProviderRequestFailed("scripted".to_string()))
    }
}

pub fn record(name: &str, priority: Priority, confidence: f64) -> TestCaseRecord {
    let mut record = TestCaseRecord::new(name, "scripted");
    record.priority = priority;
    record.confidence = confidence;
    record
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = parking_lot::const_mutex(());

/// Variables a test may change; restored afterwards.
const ISOLATED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "SENTINEL_ENV",
    "SENTINEL__PIPELINE__DEDUP_THRESHOLD",
    "SENTINEL__PIPELINE__BACKEND_TIMEOUT_SECS",
    "ANTHROPIC_API_KEY",
    "CLAUDE_API_KEY",
    "GEMINI_API_KEY",
    "OPENAI_API_KEY",
];

/// Run `f` with `XDG_CONFIG_HOME` pointing into `test_dir`, provider key
/// variables cleared, and the environment restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock();
    let saved: Vec<(&str, Option<String>)> = ISOLATED_VARS
        .iter()
        .map(|name| (*name, std::env::var(name).ok()))
        .collect();

    for name in ISOLATED_VARS {
        std::env::remove_var(name);
    }
    let home = test_dir.path().join("home");
    std::fs::create_dir_all(&home).unwrap();
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", test_dir.path().join("config"));

    let result = f();

    for (name, value) in saved {
        match value {
            Some(value) => std::env::set_var(name, value),
            None => std::env::remove_var(name),
        }
    }
    result
}
