//! Sentinel CLI Binary
//!
//! Reads the listed source files, runs the generation pipeline over them and
//! writes the progress events to stdout as NDJSON. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use sentinel::config::{ConfigLoader, SentinelConfig};
use sentinel::logging::{init_logging, LoggingConfig};
use sentinel::ndjson::run_pipeline;
use sentinel::Orchestrator;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "sentinel")]
#[command(about = "Generate test cases for source files with several model backends")]
struct Cli {
    /// Source files to analyse
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Workspace root; file keys are made relative to it
    #[arg(long, default_value = ".")]
    workspace: PathBuf,

    /// Explicit configuration file (skips layered discovery)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable logging
    #[arg(long, default_value = "false")]
    verbose: bool,

    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    log_format: Option<String>,

    #[arg(long)]
    log_output: Option<String>,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(Some(&build_logging_config(&cli, &config))) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&cli, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("{:#}", e);
        process::exit(1);
    }
}

async fn run(cli: &Cli, config: SentinelConfig) -> Result<()> {
    let files = read_files(&cli.workspace, &cli.files)?;
    info!(files = files.len(), "Sentinel starting");

    let orchestrator = Arc::new(Orchestrator::from_config(&config));
    let mut lines = run_pipeline(&orchestrator, &files, config.pipeline.per_file_chars);

    let stdout = std::io::stdout();
    while let Some(line) = lines.next().await {
        let mut out = stdout.lock();
        out.write_all(line.as_bytes()).context("writing to stdout")?;
        out.flush().context("flushing stdout")?;
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<SentinelConfig> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::load(&cli.workspace).context("loading configuration")?,
    };
    Ok(config.with_default_backends())
}

/// Build logging configuration from CLI args over the config file
fn build_logging_config(cli: &Cli, config: &SentinelConfig) -> LoggingConfig {
    if !cli.verbose {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut logging = config.logging.clone();
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        logging.file = file.clone();
    }
    logging
}

fn read_files(workspace: &Path, paths: &[PathBuf]) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for path in paths {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let key = path.strip_prefix(workspace).unwrap_or(path);
        files.insert(key.to_string_lossy().replace('\\', "/"), content);
    }
    Ok(files)
}
