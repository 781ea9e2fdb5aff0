use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use burn::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use segdiag::{
    burn_backend_types::{InferenceBackend, InferenceDevice, NAME},
    report::{RenderMode, RuleSet},
    run_pipeline, MaskFolderPredictor, PipelineConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "segdiag")]
#[command(
    about = "Failure analysis for semantic segmentation: worst cases, likely causes and reports"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Image, ground truth and prediction next to each other
    SideBySide,
    /// Image blended with the prediction
    Overlay,
    /// Prediction overlay followed by a ground-truth overlay
    OverlayWithGt,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::SideBySide => Self::SideBySide,
            Mode::Overlay => Self::Overlay {
                include_ground_truth: false,
            },
            Mode::OverlayWithGt => Self::Overlay {
                include_ground_truth: true,
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate predicted masks against a dataset and write failure analysis artifacts
    Evaluate {
        /// Dataset root containing the image and mask directories
        #[arg(short, long)]
        dataset: Option<String>,

        /// Directory of predicted masks, named like the dataset images
        #[arg(short, long)]
        predictions: PathBuf,

        /// Output directory for artifacts
        #[arg(short, long)]
        output: Option<String>,

        /// Pipeline configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of worst cases to report
        #[arg(short = 'k', long)]
        worst_k: Option<usize>,

        /// Visualization layout
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,

        /// Evaluation threads (0 = all cores, 1 = sequential)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Dataset root to record in the file
        #[arg(short, long)]
        dataset: String,

        /// Where to write the configuration
        #[arg(default_value = "segdiag.json")]
        path: PathBuf,
    },

    /// Show the default rule table
    Rules,

    /// Show backend information
    Info,
}

fn load_config(config: Option<PathBuf>, dataset: Option<String>) -> Result<PipelineConfig> {
    let mut pipeline = match (config, dataset.clone()) {
        (Some(path), _) => PipelineConfig::from_file(&path)?,
        (None, Some(dataset)) => PipelineConfig::new(dataset),
        (None, None) => bail!("either --dataset or --config is required"),
    };
    if let Some(dataset) = dataset {
        pipeline.dataset_root = dataset;
    }
    Ok(pipeline)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Evaluate {
            dataset,
            predictions,
            output,
            config,
            worst_k,
            mode,
            workers,
        } => {
            let mut config = load_config(config, dataset)?;
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(worst_k) = worst_k {
                config.worst_k = worst_k;
            }
            if let Some(mode) = mode {
                config.render_mode = mode.into();
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }

            let predictor = MaskFolderPredictor::open(&predictions, config.mask_encoding.clone())
                .with_context(|| {
                    format!("failed to open predictions {}", predictions.display())
                })?;
            let device = InferenceDevice::default();
            let summary = run_pipeline::<InferenceBackend, _>(&config, &predictor, device)?;

            println!("Evaluated {} of {} samples", summary.evaluated, summary.total_samples);
            if summary.skipped > 0 {
                println!("Skipped {} samples (see dataset_summary.json)", summary.skipped);
            }
            match summary.mean_iou {
                Some(mean_iou) => println!("Mean IoU: {mean_iou:.4}"),
                None => println!("Mean IoU: undefined"),
            }
            println!("Report: {}", summary.report_path.display());
            Ok(())
        }

        Commands::InitConfig { dataset, path } => {
            PipelineConfig::new(dataset)
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
            Ok(())
        }

        Commands::Rules => {
            println!("{}", serde_json::to_string_pretty(&RuleSet::default())?);
            Ok(())
        }

        Commands::Info => {
            println!("segdiag Information:");
            println!("  Backend: {NAME}");
            println!("  Device: {:?}", InferenceDevice::default());
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    run(cli).inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "segdiag failed"))
}
