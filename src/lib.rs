//! Sentinel: Multi-Backend Test Case Generation
//!
//! Fans a source-code context out to several model backends, recovers their
//! structured output, cleans the generated test code, merges the batches into
//! one deduplicated and ranked suite, and reports progress as a stream of
//! newline-delimited JSON events.

pub mod analysis;
pub mod backend;
pub mod config;
pub mod context;
pub mod coverage;
pub mod dedup;
pub mod error;
pub mod fallback;
pub mod logging;
pub mod metrics;
pub mod ndjson;
pub mod orchestrator;
pub mod progress;
pub mod provider;
pub mod rank;
pub mod record;
pub mod repair;
pub mod sanitize;

pub use error::ApiError;
pub use orchestrator::Orchestrator;
pub use progress::ProgressEvent;
pub use record::TestCaseRecord;
