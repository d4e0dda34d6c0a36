//! Integration tests for the Sentinel generation pipeline

mod config_integration;
mod pipeline;
pub mod test_utils;
