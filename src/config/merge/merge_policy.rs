//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("pipeline.dedup_threshold", 0.8)?
        .set_default("pipeline.backend_timeout_secs", 180_i64)?
        .set_default("pipeline.analysis_timeout_secs", 60_i64)?
        .set_default("pipeline.per_file_chars", 15_000_i64)?
        .set_default("metrics.hourly_rate", 75.0)?
        .set_default("metrics.tests_per_hour", 3.0)
}
