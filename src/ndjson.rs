//! Newline-delimited JSON entry point.
//!
//! A host (HTTP handler, CLI) hands over the ingested files and forwards the
//! returned lines verbatim with [`NDJSON_CONTENT_TYPE`].

use crate::context::build_context;
use crate::orchestrator::Orchestrator;
use crate::progress::ProgressEvent;
use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::error;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Run the pipeline over `files` (relative path → content) and yield one
/// serialized event per line. Dropping the stream cancels the run.
pub fn run_pipeline(
    orchestrator: &Arc<Orchestrator>,
    files: &BTreeMap<String, String>,
    per_file_chars: usize,
) -> impl Stream<Item = String> + Send + Unpin {
    let context = build_context(files, per_file_chars);
    orchestrator.run(context).map(|event| encode(&event))
}

/// Encode one event. An event that cannot be serialized is replaced by an
/// `error` line so the consumer still sees a well-formed stream.
pub fn encode(event: &ProgressEvent) -> String {
    match event.to_ndjson_line() {
        Ok(line) => line,
        Err(err) => {
            error!(event = event.event_type(), error = %err, "event serialization failed");
            ProgressEvent::error(err.to_string())
                .to_ndjson_line()
                .unwrap_or_else(|_| "{\"type\":\"error\",\"message\":\"serialization failed\"}\n".to_string())
        }
    }
}
