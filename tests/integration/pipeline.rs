//! End-to-end pipeline runs against scripted backends

use crate::integration::test_utils::{record, Behavior, ScriptedAnalyzer, ScriptedBackend};
use async_trait::async_trait;
use futures::StreamExt;
use sentinel::analysis::{ArchitectureAnalyzer, ArchitectureSummary};
use sentinel::backend::{GenerationBackend, GenerationBatch, GenerationOutcome};
use sentinel::error::{ApiError, FailureKind};
use sentinel::fallback::{FALLBACK_PROVENANCE, FALLBACK_RECORD_COUNT};
use sentinel::orchestrator::{Orchestrator, PipelineSettings};
use sentinel::progress::{ProgressEvent, TestResultsData};
use sentinel::record::Priority;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CALC_CONTEXT: &str = "FILE: calc.py\ndef divide(a, b):\n    return a / b\n====================";

async fn run(orchestrator: Orchestrator) -> Vec<ProgressEvent> {
    Arc::new(orchestrator).run(CALC_CONTEXT).collect().await
}

fn results(events: &[ProgressEvent]) -> &TestResultsData {
    events
        .iter()
        .find_map(|event| match event {
            ProgressEvent::TestResults { data } => Some(data),
            _ => None,
        })
        .expect("a test_results event")
}

fn statuses(events: &[ProgressEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            ProgressEvent::Status { message } => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_divide_by_zero_end_to_end() {
    let architect = r#"{"test_cases":[{"test_case_name":"Divide by zero raises ZeroDivisionError","priority":"High","complexity":"Simple","category":"Edge Case","confidence_score":0.95,"code":"```python\nimport pytest\nfrom calc import divide\n\ndef test_divide_by_zero():\n    with pytest.raises(ZeroDivisionError):\n        divide(1, 0)\n```"}]}"#;
    let security = "```json\n{\"test_cases\":[{\"test_case_name\":\"divide by zero raises zerodivisionerror\",\"priority\":\"High\",\"confidence_score\":0.92},{\"test_case_name\":\"Non-numeric operands\",\"priority\":\"Medium\",\"confidence_score\":0.92}]}\n```";

    let orchestrator = Orchestrator::builder()
        .backend(ScriptedBackend::new("architect", Behavior::Raw(architect.to_string())).shared())
        .backend(ScriptedBackend::new("security", Behavior::Raw(security.to_string())).shared())
        .build();
    let events = run(orchestrator).await;
    let data = results(&events);

    assert!(!data.degraded);
    assert_eq!(data.total_generated, 3);
    assert_eq!(data.duplicates_removed, 1);
    assert_eq!(data.total, 2);

    let top = &data.test_cases[0];
    assert_eq!(top.name, "Divide by zero raises ZeroDivisionError");
    assert_eq!(top.priority, Priority::High);
    assert_eq!(top.provenance, "architect");
    let code = top.code.as_deref().unwrap();
    assert!(code.starts_with("import pytest"));
    assert!(code.contains("divide(1, 0)"));
    assert!(!code.contains("```"));

    assert_eq!(data.test_cases[1].name, "Non-numeric operands");
    assert_eq!(data.models_used, ["architect", "security"]);
}

#[tokio::test]
async fn test_events_are_emitted_in_pipeline_order() {
    let orchestrator = Orchestrator::builder()
        .backend(
            ScriptedBackend::new("a", Behavior::Records(vec![record("One", Priority::Low, 0.5)]))
                .shared(),
        )
        .build();
    let events = run(orchestrator).await;
    let kinds: Vec<_> = events.iter().map(|event| event.event_type()).collect();
    assert_eq!(
        kinds,
        ["status", "analysis_result", "status", "status", "test_results", "status"]
    );
    assert_eq!(
        statuses(&events),
        [
            "Scanning architecture...",
            "Designing test scenarios...",
            "Formatting results...",
            "Done!"
        ]
    );
}

#[tokio::test]
async fn test_all_backends_failing_degrades_to_fallback() {
    let orchestrator = Orchestrator::builder()
        .backend(ScriptedBackend::new("a", Behavior::Fail(FailureKind::RateLimited)).shared())
        .backend(ScriptedBackend::new("b", Behavior::Fail(FailureKind::Auth)).shared())
        .backend(ScriptedBackend::new("c", Behavior::Raw("I cannot help with that.".into())).shared())
        .build();
    let events = run(orchestrator).await;

    assert!(events.iter().all(|event| event.event_type() != "error"));
    assert!(statuses(&events)
        .contains(&"No backend produced usable records. Engaging fallback generator..."));

    let data = results(&events);
    assert!(data.degraded);
    assert_eq!(data.total, FALLBACK_RECORD_COUNT);
    assert_eq!(data.duplicates_removed, 0);
    assert!(data
        .test_cases
        .iter()
        .all(|r| r.provenance == FALLBACK_PROVENANCE));
    // Only "c" completed, with nothing usable
    assert_eq!(data.models_used, ["c"]);
}

#[tokio::test]
async fn test_truncated_backend_output_is_recovered() {
    let truncated = r#"{"test_cases":[{"test_case_name":"Zero numerator","priority":"Low"},{"test_case_name":"Negative divisor","priority":"Critical","code":"def test_negative("#;
    let orchestrator = Orchestrator::builder()
        .backend(ScriptedBackend::new("a", Behavior::Raw(truncated.to_string())).shared())
        .build();
    let events = run(orchestrator).await;
    let data = results(&events);

    assert!(!data.degraded);
    let names: Vec<_> = data.test_cases.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Negative divisor", "Zero numerator"]);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_and_slow_backends_are_contained() {
    let settings = PipelineSettings {
        backend_timeout: Duration::from_secs(2),
        ..PipelineSettings::default()
    };
    let orchestrator = Orchestrator::builder()
        .settings(settings)
        .backend(ScriptedBackend::new("panics", Behavior::Panic).shared())
        .backend(
            ScriptedBackend::new("slow", Behavior::Records(vec![record("Late", Priority::Critical, 1.0)]))
                .with_delay(Duration::from_secs(30))
                .shared(),
        )
        .backend(
            ScriptedBackend::new("good", Behavior::Records(vec![record("On time", Priority::Low, 0.7)]))
                .with_cost(0.004)
                .shared(),
        )
        .build();
    let events = run(orchestrator).await;

    assert!(events.iter().all(|event| event.event_type() != "error"));
    let data = results(&events);
    assert_eq!(data.models_used, ["good"]);
    assert_eq!(data.test_cases.len(), 1);
    assert_eq!(data.test_cases[0].name, "On time");
    assert_eq!(data.metrics.cost_breakdown.backends.get("good"), Some(&0.004));
}

#[tokio::test(start_paused = true)]
async fn test_backends_run_concurrently() {
    let orchestrator = Orchestrator::builder()
        .backend(
            ScriptedBackend::new("a", Behavior::Records(vec![record("A", Priority::Low, 0.5)]))
                .with_delay(Duration::from_secs(3))
                .shared(),
        )
        .backend(
            ScriptedBackend::new("b", Behavior::Records(vec![record("B", Priority::Low, 0.5)]))
                .with_delay(Duration::from_secs(3))
                .shared(),
        )
        .build();

    let started = tokio::time::Instant::now();
    let events = run(orchestrator).await;
    assert!(started.elapsed() < Duration::from_secs(6));
    assert_eq!(results(&events).total, 2);
}

#[tokio::test]
async fn test_analysis_summary_is_streamed() {
    let summary = ArchitectureSummary {
        project_summary: "A calculator module.".to_string(),
        gap_analysis: "- No input validation".to_string(),
    };
    let orchestrator = Orchestrator::builder()
        .analyzer(Arc::new(ScriptedAnalyzer(Some(summary.clone()))))
        .build();
    let events = run(orchestrator).await;
    assert_eq!(events[1], ProgressEvent::AnalysisResult { data: summary });
}

#[tokio::test]
async fn test_failed_analysis_uses_placeholder() {
    let orchestrator = Orchestrator::builder()
        .analyzer(Arc::new(ScriptedAnalyzer(None)))
        .build();
    let events = run(orchestrator).await;
    assert_eq!(
        events[1],
        ProgressEvent::AnalysisResult {
            data: ArchitectureSummary::placeholder()
        }
    );
}

struct ExplodingAnalyzer;

#[async_trait]
impl ArchitectureAnalyzer for ExplodingAnalyzer {
    async fn analyze(&self, _context: &str) -> Result<ArchitectureSummary, ApiError> {
        panic!("analysis state corrupted")
    }
}

#[tokio::test]
async fn test_panicking_analyzer_falls_back_to_placeholder() {
    let backend = ScriptedBackend::new("a", Behavior::Records(vec![record("A", Priority::Low, 0.5)])).shared();
    let orchestrator = Orchestrator::builder()
        .backend(backend.clone())
        .analyzer(Arc::new(ExplodingAnalyzer))
        .build();
    let events = run(orchestrator).await;

    assert!(events.iter().all(|event| event.event_type() != "error"));
    assert_eq!(
        events[1],
        ProgressEvent::AnalysisResult {
            data: ArchitectureSummary::placeholder()
        }
    );
    let data = results(&events);
    assert_eq!(data.test_cases.len(), 1);
    assert!(!data.degraded);
    assert_eq!(events.last().map(|e| e.event_type()), Some("status"));
    assert_eq!(backend.calls(), 1);
}

struct FlagOnFinish(Arc<AtomicBool>);

#[async_trait]
impl GenerationBackend for FlagOnFinish {
    fn name(&self) -> &str {
        "flag"
    }

    async fn generate(&self, _context: &str) -> GenerationOutcome {
        tokio::time::sleep(Duration::from_secs(1)).await;
        self.0.store(true, Ordering::SeqCst);
        GenerationOutcome::Completed(GenerationBatch::empty("flag"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_stream_abandons_in_flight_backends() {
    let finished = Arc::new(AtomicBool::new(false));
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .backend(Arc::new(FlagOnFinish(finished.clone())))
            .build(),
    );

    let mut stream = orchestrator.run(CALC_CONTEXT);
    loop {
        match stream.next().await {
            Some(ProgressEvent::Status { message }) if message == "Designing test scenarios..." => break,
            Some(_) => continue,
            None => panic!("stream ended early"),
        }
    }
    drop(stream);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_runs_are_independent() {
    let orchestrator = Arc::new(
        Orchestrator::builder()
            .backend(
                ScriptedBackend::new("a", Behavior::Records(vec![record("A", Priority::High, 0.9)]))
                    .shared(),
            )
            .build(),
    );
    let (first, second): (Vec<_>, Vec<_>) = tokio::join!(
        orchestrator.run(CALC_CONTEXT).collect(),
        orchestrator.run(CALC_CONTEXT).collect()
    );
    assert_eq!(results(&first).test_cases, results(&second).test_cases);
    assert_eq!(first.len(), second.len());
}
