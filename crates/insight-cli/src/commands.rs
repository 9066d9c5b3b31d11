//! Command handlers

use crate::cli::{Cli, Commands};
use crate::output::{output_analysis, output_batch};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use insight_app::app::{AnalysisService, AnalysisServiceError};
use insight_app::config::Config;
use insight_app::scanner::{load_task, scan_inputs};
use insight_app::session::{BatchAction, BatchSession, SingleSession};
use insight_types::{
    AnalysisType, BatchEntry, BatchResults, Error, ImageTask, OutputFormat, RecordStatus, Result,
};
use insight_vision::{read_image, BatchEvent};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let mut config = Config::load()?;

    // Override from CLI args
    if let Some(ref model) = cli.model {
        config.model = model.clone();
    }
    if let Some(ref base_url) = cli.base_url {
        config.base_url = base_url.clone();
    }
    let output_format = cli.format.unwrap_or(config.output_format);

    match &cli.command {
        Commands::Analyze {
            image,
            analysis_type,
        } => cmd_analyze(&config, image, *analysis_type, output_format),

        Commands::Batch {
            paths,
            output,
            jobs,
        } => {
            if let Some(jobs) = jobs {
                config.jobs = *jobs;
            }
            cmd_batch(&cli, &config, paths, output.clone(), output_format)
        }

        Commands::Config {
            show,
            set_model,
            set_base_url,
            set_jobs,
            set_timeout,
            set_output,
            reset,
        } => cmd_config(
            *show,
            set_model.clone(),
            set_base_url.clone(),
            *set_jobs,
            *set_timeout,
            *set_output,
            *reset,
        ),
    }
}

/// Map service errors back onto the shared error type for reporting
fn service_error(err: AnalysisServiceError) -> Error {
    match err {
        AnalysisServiceError::InvalidImage(msg) => Error::InvalidImage(msg),
        AnalysisServiceError::EmptyBatch(msg) => Error::Validation(msg),
        AnalysisServiceError::ConfigError(e) => Error::Config(e),
        AnalysisServiceError::AnalysisFailed(msg) => Error::Inference(msg),
    }
}

/// Text printed for a failed command. Remote failures show the generic
/// retry message; their detail only goes to the debug log.
pub fn error_report(err: &Error) -> String {
    match err {
        Error::Inference(_) => {
            debug!("{}", err);
            err.user_message().to_string()
        }
        _ => err.to_string(),
    }
}

fn display_label(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn cmd_analyze(
    config: &Config,
    image: &Path,
    analysis_type: AnalysisType,
    output_format: OutputFormat,
) -> Result<()> {
    let label = display_label(image);
    // Content is validated by the session, not by extension
    let task = ImageTask::new(label.clone(), read_image(image)?);

    let service = AnalysisService::from_config(config).map_err(service_error)?;
    let mut session = SingleSession::new();

    let text = service
        .analyze_single(&mut session, task, analysis_type)
        .map_err(service_error)?;

    output_analysis(output_format, &label, analysis_type, &text)
}

fn cmd_batch(
    cli: &Cli,
    config: &Config,
    paths: &[PathBuf],
    output: Option<PathBuf>,
    output_format: OutputFormat,
) -> Result<()> {
    let images = scan_inputs(paths)?;

    let mut tasks = Vec::with_capacity(images.len());
    for path in &images {
        match load_task(path) {
            Ok(task) => tasks.push(task),
            Err(Error::InvalidImage(_)) => {
                warn!("Skipping {}: not a valid image file", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    let service = AnalysisService::from_config(config).map_err(service_error)?;

    let mut session = BatchSession::new();
    session.dispatch(BatchAction::Upload(tasks));

    let labels: Vec<String> = session
        .items()
        .iter()
        .map(|item| item.task.label.clone())
        .collect();

    if cli.verbose {
        eprintln!(
            "Found {} images to analyze with {} parallel jobs",
            labels.len(),
            service.jobs()
        );
    }

    let pb = ProgressBar::new(labels.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let verbose = cli.verbose;
    let on_event = |event: BatchEvent| match event {
        BatchEvent::Started { index, .. } => {
            if verbose {
                pb.set_message(labels[index].clone());
            }
        }
        BatchEvent::Finished { index, record, .. } => {
            if record.status == RecordStatus::Error {
                pb.println(format!("Failed to analyze {}", labels[index]));
            }
            pb.inc(1);
        }
    };

    let started_at = Utc::now();
    let records = service
        .analyze_batch(&mut session, Some(&on_event))
        .map_err(service_error)?;
    pb.finish_with_message("Complete");
    if let Some(message) = session.error() {
        warn!("{}", message);
    }
    let completed_at = Utc::now();

    let entries = labels
        .iter()
        .zip(records)
        .map(|(image, record)| BatchEntry {
            image: image.clone(),
            record,
        })
        .collect();
    let results = BatchResults::new(entries, started_at, completed_at);

    if let Some(output_path) = output {
        let content = serde_json::to_string_pretty(&results)?;
        std::fs::write(&output_path, content)?;
        println!("Results saved to: {}", output_path.display());
    }

    output_batch(output_format, &results)
}

fn cmd_config(
    show: bool,
    set_model: Option<String>,
    set_base_url: Option<String>,
    set_jobs: Option<usize>,
    set_timeout: Option<u64>,
    set_output: Option<OutputFormat>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(model) = set_model {
        config.model = model;
        modified = true;
    }

    if let Some(base_url) = set_base_url {
        config.base_url = base_url;
        modified = true;
    }

    if let Some(jobs) = set_jobs {
        config.jobs = jobs;
        modified = true;
    }

    if let Some(timeout) = set_timeout {
        config.request_timeout_secs = timeout.max(1);
        modified = true;
    }

    if let Some(format) = set_output {
        config.output_format = format;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration saved");
    }

    if show || !modified {
        println!("{}", config);
    }

    Ok(())
}
