//! Property-based tests for the record pipeline stages

mod dedup;
mod rank;
mod sanitize;
