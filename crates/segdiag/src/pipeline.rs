//! End-to-end failure analysis: evaluate, rank, diagnose, render and persist.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use burn::{config::Config, tensor::backend::Backend};
use segdiag_eval::{
    CaseAggregator, EvaluationOutcome, FolderLayout, MaskEncoding, Predictor, SampleSource,
    SegmentationFolder,
};
use segdiag_metric::ClassRegistry;
use segdiag_report::{
    artifact::{DATASET_SUMMARY, FAILURE_EXAMPLES, PER_CLASS_IOU},
    timestamp_now, visualization_name, ArtifactStore, FailureReport, RenderMode, Renderer,
    ReportGenerator, RuleSet,
};
use serde_json::Value;

/// Pipeline configuration.
///
/// Loaded from JSON with [`PipelineConfig::from_file`]; fields left out of the file take
/// their defaults.
#[derive(Config, Debug)]
pub struct PipelineConfig {
    /// Dataset root containing the image and mask directories.
    pub dataset_root: String,

    /// Directory the artifacts are written to.
    #[config(default = "String::from(\"results\")")]
    pub output_dir: String,

    /// Number of worst cases to keep.
    #[config(default = 5)]
    pub worst_k: usize,

    /// Lowest-IoU classes listed per case.
    #[config(default = 3)]
    pub worst_class_count: usize,

    #[config(default = "RenderMode::SideBySide")]
    pub render_mode: RenderMode,

    /// Mask weight of overlay panels.
    #[config(default = 0.4)]
    pub overlay_alpha: f64,

    /// Evaluation threads. 0 uses the rayon default, 1 evaluates on the calling thread.
    #[config(default = 0)]
    pub workers: usize,

    #[config(default = "FolderLayout::default()")]
    pub layout: FolderLayout,

    #[config(default = "MaskEncoding::Direct")]
    pub mask_encoding: MaskEncoding,

    #[config(default = "ClassRegistry::offroad_terrain()")]
    pub registry: ClassRegistry,

    #[config(default = "RuleSet::offroad_terrain()")]
    pub rules: RuleSet,
}

impl PipelineConfig {
    /// Parses a JSON configuration. Only `dataset_root` is required.
    pub fn from_json(json: &str) -> Result<Self> {
        let Value::Object(fields) = serde_json::from_str(json)? else {
            bail!("configuration must be a JSON object");
        };
        let Some(dataset_root) = fields.get("dataset_root").and_then(Value::as_str) else {
            bail!("configuration is missing `dataset_root`");
        };

        let mut merged = serde_json::to_value(Self::new(dataset_root.to_string()))?;
        if let Value::Object(defaults) = &mut merged {
            defaults.extend(fields);
        }
        Ok(serde_json::from_value(merged)?)
    }

    /// Reads a JSON configuration file, filling missing fields with their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        Self::from_json(&json)
            .with_context(|| format!("invalid configuration {}", path.display()))
    }
}

/// What a pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub total_samples: usize,
    pub evaluated: usize,
    pub skipped: usize,
    pub mean_iou: Option<f64>,
    pub report_path: PathBuf,
    pub images: Vec<PathBuf>,
}

/// Evaluates every sample of `source` and ranks the worst cases.
pub fn evaluate<B, P, S>(
    config: &PipelineConfig,
    source: &S,
    predictor: &P,
    device: B::Device,
) -> Result<EvaluationOutcome>
where
    B: Backend,
    P: Predictor<B>,
    S: SampleSource + ?Sized,
{
    let registry = Arc::new(config.registry.clone());
    let aggregator = CaseAggregator::<B, P>::new(registry, predictor, device, config.worst_k)?;

    let outcome = if config.workers == 1 {
        aggregator.run(source)?
    } else {
        aggregator.run_parallel(source, config.workers)?
    };
    Ok(outcome)
}

/// Writes every artifact for an evaluation outcome into `config.output_dir`.
///
/// Images are rendered only for the ranked cases. The failure report is written last, so
/// its presence means the run completed.
pub fn write_artifacts(
    config: &PipelineConfig,
    outcome: &EvaluationOutcome,
) -> Result<PipelineSummary> {
    let registry = Arc::new(config.registry.clone());
    let store = ArtifactStore::create(&config.output_dir)?;
    let summary = &outcome.summary;

    store.write_json(PER_CLASS_IOU, &summary.per_class_named(&registry))?;
    store.write_json(DATASET_SUMMARY, summary)?;

    let renderer = Renderer::new(registry.clone(), config.render_mode, config.overlay_alpha)?;
    let mut images = Vec::with_capacity(outcome.worst_cases.len());
    let mut image_names = Vec::with_capacity(outcome.worst_cases.len());
    for (position, case) in outcome.worst_cases.iter().enumerate() {
        let name = visualization_name(position + 1);
        let written = renderer
            .render(case)
            .and_then(|image| store.write_image(&name, &image));
        match written {
            Ok(path) => {
                images.push(path);
                image_names.push(name);
            }
            Err(e) => tracing::warn!(sample = %case.sample_id, error = %e, "failed to render case"),
        }
    }
    store.write_json(FAILURE_EXAMPLES, &image_names)?;

    let benchmark = store.load_benchmark().map(|benchmark| benchmark.annotation());
    let generator = ReportGenerator::new(registry, config.rules.clone(), config.worst_class_count);
    let report: FailureReport = generator.generate(outcome, benchmark, timestamp_now())?;
    report.validate(config.worst_k)?;
    let report_path = store.write_failure_report(&report)?;

    tracing::info!(
        output = %store.root().display(),
        cases = report.worst_cases.len(),
        images = images.len(),
        "artifacts written",
    );

    Ok(PipelineSummary {
        total_samples: summary.total_samples,
        evaluated: summary.evaluated,
        skipped: summary.skipped_count,
        mean_iou: summary.mean_iou,
        report_path,
        images,
    })
}

/// Runs the full pipeline over the on-disk dataset named by `config`.
///
/// # Errors
///
/// Fails when the dataset cannot be opened, the configuration is invalid or an artifact
/// cannot be written. Per-sample failures are recorded in the report instead.
pub fn run_pipeline<B, P>(
    config: &PipelineConfig,
    predictor: &P,
    device: B::Device,
) -> Result<PipelineSummary>
where
    B: Backend,
    P: Predictor<B>,
{
    tracing::info!(
        dataset = %config.dataset_root,
        output = %config.output_dir,
        k = config.worst_k,
        "running failure analysis",
    );

    let source = SegmentationFolder::open(
        Path::new(&config.dataset_root),
        &config.layout,
        config.mask_encoding.clone(),
    )
    .with_context(|| format!("failed to open dataset {}", config.dataset_root))?;

    let outcome = evaluate::<B, P, _>(config, &source, predictor, device)?;
    write_artifacts(config, &outcome)
}
