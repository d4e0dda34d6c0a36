//! Event schema for the progress stream.
//!
//! Serialized one object per line with a `type` tag:
//! `status`, `analysis_result`, `test_results` or `error`.

use crate::analysis::ArchitectureSummary;
use crate::coverage::CoverageReport;
use crate::error::ApiError;
use crate::metrics::AggregateMetrics;
use crate::record::TestCaseRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Status { message: String },
    AnalysisResult { data: ArchitectureSummary },
    TestResults { data: TestResultsData },
    Error { message: String },
}

/// Payload of the final `test_results` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultsData {
    pub test_cases: Vec<TestCaseRecord>,
    pub metrics: AggregateMetrics,
    pub total: usize,
    pub coverage: CoverageReport,
    /// Backends that completed, in backend order
    pub models_used: Vec<String>,
    pub duplicates_removed: usize,
    /// Records before deduplication
    pub total_generated: usize,
    /// True when the records are the synthetic fallback batch
    pub degraded: bool,
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
        }
    }

    /// Wire tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::AnalysisResult { .. } => "analysis_result",
            ProgressEvent::TestResults { .. } => "test_results",
            ProgressEvent::Error { .. } => "error",
        }
    }

    /// One NDJSON line, newline included.
    pub fn to_ndjson_line(&self) -> Result<String, ApiError> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
