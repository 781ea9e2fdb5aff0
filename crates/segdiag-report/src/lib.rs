//! # segdiag report
//!
//! Turns the worst-ranked cases of an evaluation into diagnostics:
//! a declarative [`RuleSet`] for likely causes and recommendations, the [`FailureReport`]
//! artifact, composite images from the [`Renderer`], and an [`ArtifactStore`] that writes
//! atomically and reads previously produced artifacts without failing the run.

pub mod artifact;
pub mod benchmark;
pub mod error;
pub mod report;
pub mod rules;
pub mod visualize;

pub use artifact::{synthesize_per_class_iou, visualization_name, ArtifactStore, PerClassIou};
pub use benchmark::{BenchmarkAnnotation, BenchmarkResult, BenchmarkStatus, TimingStats};
pub use error::{ArtifactError, ReportError, ReportResult};
pub use report::{timestamp_now, CaseReport, FailureReport, ReportGenerator, WorstClass};
pub use rules::{CaseMetrics, ClassAdvice, Diagnosis, Rule, RuleSet};
pub use visualize::{RenderMode, Renderer, DEFAULT_OVERLAY_ALPHA};
