//! `segdiag`: failure analysis for semantic segmentation models.
//!
//! Scores a model's predictions with per-class IoU, keeps the worst cases, explains them
//! with a declarative rule table and writes JSON reports plus diagnostic images for
//! downstream dashboards and packaging tools.

pub mod backend;
pub mod pipeline;
pub mod predictor;

#[doc(inline)]
pub use backend::burn_backend_types;
pub use pipeline::{evaluate, run_pipeline, write_artifacts, PipelineConfig, PipelineSummary};
pub use predictor::MaskFolderPredictor;
#[doc(inline)]
pub use segdiag_eval as eval;
#[doc(inline)]
pub use segdiag_metric as metric;
#[doc(inline)]
pub use segdiag_report as report;
