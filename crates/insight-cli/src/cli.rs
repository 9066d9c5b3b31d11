//! CLI definition using clap

use clap::{Parser, Subcommand};
use insight_types::{AnalysisType, OutputFormat};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "photo-insight")]
#[command(version)]
#[command(about = "Accident scene and prescription analysis using a multimodal language model")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Model name override
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Endpoint base URL override (OpenAI-compatible)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Output format (json, table). Uses config value if not specified.
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a single image
    Analyze {
        /// Path to image file
        image: PathBuf,

        /// Kind of analysis to run
        #[arg(long = "type", short = 't', value_enum, default_value_t = AnalysisType::Accident)]
        analysis_type: AnalysisType,
    },

    /// Analyze accident images in parallel and extract a table row per image
    Batch {
        /// Image files or folders containing images
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Write results as JSON to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Number of concurrent requests. 0 = auto (CPU count). Uses config value if not specified.
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
    },

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set model
        #[arg(long)]
        set_model: Option<String>,

        /// Set endpoint base URL
        #[arg(long)]
        set_base_url: Option<String>,

        /// Set default batch concurrency (0 = CPU count)
        #[arg(long)]
        set_jobs: Option<usize>,

        /// Set request timeout in seconds
        #[arg(long)]
        set_timeout: Option<u64>,

        /// Set default output format
        #[arg(long)]
        set_output: Option<OutputFormat>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_defaults_to_accident() {
        let cli = Cli::parse_from(["photo-insight", "analyze", "crash.jpg"]);
        match cli.command {
            Commands::Analyze { image, analysis_type } => {
                assert_eq!(image, PathBuf::from("crash.jpg"));
                assert_eq!(analysis_type, AnalysisType::Accident);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_prescription() {
        let cli = Cli::parse_from(["photo-insight", "analyze", "rx.png", "--type", "prescription"]);
        assert!(matches!(
            cli.command,
            Commands::Analyze {
                analysis_type: AnalysisType::Prescription,
                ..
            }
        ));
    }

    #[test]
    fn test_batch_requires_paths() {
        assert!(Cli::try_parse_from(["photo-insight", "batch"]).is_err());

        let cli = Cli::try_parse_from(["photo-insight", "-f", "json", "batch", "a.jpg", "dir", "-j", "2"]).unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        match cli.command {
            Commands::Batch { paths, jobs, .. } => {
                assert_eq!(paths.len(), 2);
                assert_eq!(jobs, Some(2));
            }
            _ => panic!("expected batch"),
        }
    }
}
