//! Progress streaming primitives.
//!
//! A pipeline run reports through an [`EventSink`]; the caller consumes the
//! matching [`ProgressStream`]. Events arrive in pipeline order.

pub mod event;
pub mod stream;

pub use event::{ProgressEvent, TestResultsData};
pub use stream::{channel, EventSink, ProgressStream};
