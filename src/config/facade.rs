//! Config loader facade: builds a validated [`SentinelConfig`] from the layered sources.

use super::merge::merge_policy;
use super::sources::{global_file, workspace_file};
use super::SentinelConfig;
use crate::error::ApiError;
use config::{ConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

/// Prefix of environment overrides, e.g. `SENTINEL__PIPELINE__DEDUP_THRESHOLD=0.7`.
pub const ENV_PREFIX: &str = "SENTINEL";
const ENV_SEPARATOR: &str = "__";

/// Loads configuration
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with full precedence: defaults, global file, workspace files,
    /// then environment overrides.
    pub fn load(workspace_root: &Path) -> Result<SentinelConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true),
        );
        Self::finish(builder)
    }

    /// Load one explicit file over the defaults. Environment overrides are
    /// not applied.
    pub fn load_from_file(path: &Path) -> Result<SentinelConfig, ApiError> {
        let builder = merge_policy::builder_with_defaults()?.add_source(File::from(path));
        Self::finish(builder)
    }

    fn finish(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<SentinelConfig, ApiError> {
        let config: SentinelConfig = builder.build()?.try_deserialize()?;
        config.validate().map_err(|errors| {
            ApiError::ConfigError(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        debug!(backends = config.backends.len(), "configuration loaded");
        Ok(config)
    }
}
