//! Integration tests for layered configuration and orchestrator construction

use crate::integration::test_utils::with_isolated_env;
use sentinel::config::{global_config_path, ConfigLoader, SentinelConfig};
use sentinel::orchestrator::{Orchestrator, PipelineSettings};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let config = with_isolated_env(&test_dir, || ConfigLoader::load(workspace.path()).unwrap());

    assert_eq!(config.pipeline.dedup_threshold, 0.8);
    assert_eq!(config.pipeline.backend_timeout_secs, 180);
    assert_eq!(config.pipeline.per_file_chars, 15_000);
    assert_eq!(config.metrics.hourly_rate, 75.0);
    assert!(config.backends.is_empty());
}

#[test]
fn test_global_file_is_read_from_user_config_dir() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let config = with_isolated_env(&test_dir, || {
        let path = global_config_path().unwrap();
        assert!(path.starts_with(test_dir.path().join("config")));
        write(&path, "[pipeline]\ndedup_threshold = 0.7\n");
        ConfigLoader::load(workspace.path()).unwrap()
    });
    assert_eq!(config.pipeline.dedup_threshold, 0.7);
}

#[test]
fn test_precedence_global_workspace_env_file_and_environment() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write(
        &workspace.path().join("config/config.toml"),
        "[pipeline]\ndedup_threshold = 0.75\nbackend_timeout_secs = 90\n[metrics]\nhourly_rate = 100.0\n",
    );
    write(
        &workspace.path().join("config/staging.toml"),
        "[pipeline]\nbackend_timeout_secs = 45\n",
    );

    let config = with_isolated_env(&test_dir, || {
        write(
            &global_config_path().unwrap(),
            "[pipeline]\ndedup_threshold = 0.7\nanalysis_timeout_secs = 20\n",
        );
        std::env::set_var("SENTINEL_ENV", "staging");
        std::env::set_var("SENTINEL__PIPELINE__DEDUP_THRESHOLD", "0.65");
        ConfigLoader::load(workspace.path()).unwrap()
    });

    // environment beats the workspace file, which beats the global file
    assert_eq!(config.pipeline.dedup_threshold, 0.65);
    // env-specific workspace file beats the base workspace file
    assert_eq!(config.pipeline.backend_timeout_secs, 45);
    // global value survives where nothing overrides it
    assert_eq!(config.pipeline.analysis_timeout_secs, 20);
    assert_eq!(config.metrics.hourly_rate, 100.0);
}

#[test]
fn test_invalid_environment_override_is_rejected() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    let result = with_isolated_env(&test_dir, || {
        std::env::set_var("SENTINEL__PIPELINE__BACKEND_TIMEOUT_SECS", "0");
        ConfigLoader::load(workspace.path())
    });
    let err = result.unwrap_err();
    assert!(err.to_string().contains("backend_timeout_secs"));
}

#[test]
fn test_pipeline_settings_follow_config() {
    let mut config = SentinelConfig::default();
    config.pipeline.dedup_threshold = 0.5;
    config.pipeline.backend_timeout_secs = 12;
    config.pipeline.analysis_timeout_secs = 7;

    let settings = PipelineSettings::from(&config);
    assert_eq!(settings.dedup_threshold, 0.5);
    assert_eq!(settings.backend_timeout, Duration::from_secs(12));
    assert_eq!(settings.analysis_timeout, Duration::from_secs(7));
}

#[test]
fn test_orchestrator_skips_backends_without_credentials() {
    let test_dir = TempDir::new().unwrap();
    let config_dir = TempDir::new().unwrap();
    let config_file = config_dir.path().join("sentinel.toml");
    write(
        &config_file,
        r#"
[backends.local]
profile = "architect"

[backends.local.provider]
provider_type = "local"
model = "llama3"
endpoint = "http://localhost:11434/v1"

[backends.claude]
profile = "security"

[backends.claude.provider]
provider_type = "anthropic"
model = "claude-3-5-sonnet-20241022"

[backends.off]
enabled = false

[backends.off.provider]
provider_type = "local"
model = "llama3"
endpoint = "http://localhost:11434/v1"
"#,
    );

    let orchestrator = with_isolated_env(&test_dir, || {
        let config = ConfigLoader::load_from_file(&config_file).unwrap();
        Orchestrator::from_config(&config)
    });
    assert_eq!(orchestrator.backend_names(), ["local"]);
}

#[test]
fn test_default_deployment_needs_provider_keys() {
    let test_dir = TempDir::new().unwrap();
    let names = with_isolated_env(&test_dir, || {
        std::env::set_var("GEMINI_API_KEY", "test-gemini-key");
        let config = SentinelConfig::default().with_default_backends();
        assert!(config.validate().is_ok());
        Orchestrator::from_config(&config)
            .backend_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
    });
    // claude has no key in the isolated environment
    assert_eq!(names, ["gemini"]);
}

#[test]
fn test_default_claude_backend_reads_claude_api_key() {
    let test_dir = TempDir::new().unwrap();
    let names = with_isolated_env(&test_dir, || {
        std::env::set_var("GEMINI_API_KEY", "test-gemini-key");
        std::env::set_var("ANTHROPIC_API_KEY", "ignored-anthropic-key");
        let config = SentinelConfig::default().with_default_backends();
        let without_claude_key = Orchestrator::from_config(&config).backend_names().len();
        assert_eq!(without_claude_key, 1);

        std::env::set_var("CLAUDE_API_KEY", "test-claude-key");
        Orchestrator::from_config(&config)
            .backend_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
    });
    assert_eq!(names, ["claude", "gemini"]);
}
