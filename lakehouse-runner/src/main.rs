//! Lakehouse Runner
//!
//! Runs the quality-gated lakehouse pipeline over local files: validates every
//! domain, stages it, builds `fct_daily_store_metrics` and writes the CSV
//! artifacts. `validate` checks a single domain, the way an orchestrator task
//! does.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lakehouse_guard::formatters::{
    FormatterConfig, HumanFormatter, JsonFormatter, MarkdownFormatter, ReportFormatter,
};
use lakehouse_guard::logging::setup::{init_logging, LoggingConfig};
use lakehouse_guard::pipeline::Pipeline;
use lakehouse_guard::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, Level};

/// Local runner for the lakehouse pipeline
#[derive(Parser, Debug)]
#[command(name = "lakehouse-runner", version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration file (JSON); overrides --base-dir
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding samples/ and expectations/
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    /// Report format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Maximum fact rows in the preview
    #[arg(long, global = true, default_value_t = 20)]
    max_rows: usize,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate, stage and aggregate every domain, then write artifacts
    Run {
        /// Destination directory for generated artifacts
        #[arg(short, long, default_value = "local_output")]
        output_dir: PathBuf,
    },
    /// Load and validate a single domain
    Validate {
        /// Domain to validate: erp, crm, web or product
        #[arg(short, long)]
        domain: Domain,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Markdown,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        let pipeline_level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        };
        LoggingConfig::default()
            .with_pipeline_level(pipeline_level)
            .with_json_format(self.log_json)
    }

    fn pipeline_config(&self) -> Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::from_file(path)
                .with_context(|| format!("Loading configuration from {}", path.display())),
            None => PipelineConfig::from_base_dir(&self.base_dir).with_context(|| {
                format!("Building configuration for {}", self.base_dir.display())
            }),
        }
    }

    fn formatter(&self) -> Box<dyn ReportFormatter> {
        let config = FormatterConfig::default().with_max_rows(self.max_rows);
        match self.format {
            OutputFormat::Human => Box::new(HumanFormatter::with_config(config)),
            OutputFormat::Json => Box::new(JsonFormatter::with_config(config)),
            OutputFormat::Markdown => Box::new(MarkdownFormatter::with_config(config)),
        }
    }
}

async fn execute(cli: &Cli) -> Result<String> {
    let pipeline = Pipeline::new(cli.pipeline_config()?);
    let formatter = cli.formatter();
    debug!(format = ?cli.format, "Pipeline configured");

    match &cli.command {
        Some(Command::Validate { domain }) => {
            let validation = pipeline.validate_domain(*domain).await?;
            Ok(formatter.format_validation(&validation)?)
        }
        Some(Command::Run { output_dir }) => {
            run(&pipeline, formatter.as_ref(), cli, output_dir).await
        }
        None => run(&pipeline, formatter.as_ref(), cli, Path::new("local_output")).await,
    }
}

async fn run(
    pipeline: &Pipeline,
    formatter: &dyn ReportFormatter,
    cli: &Cli,
    output_dir: &Path,
) -> Result<String> {
    if cli.format == OutputFormat::Human {
        println!("Running local pipeline into {} ...", output_dir.display());
    }
    let report = pipeline.run(output_dir).await?;
    Ok(formatter.format_run(&report)?)
}

/// Stable category of a failure, for scripts reading stderr.
fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<PipelineError>()
        .map_or("runtime", PipelineError::kind)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.logging_config()) {
        eprintln!("Warning: {e}");
    }

    match execute(&cli).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Pipeline failed [{}]: {err:#}", error_kind(&err));
            ExitCode::FAILURE
        }
    }
}
