//! # segdiag evaluation
//!
//! Runs a segmentation model over a dataset and keeps only what failure analysis needs:
//! pooled per-class IoU for the whole dataset and the K worst-scoring cases.
//!
//! - [`SampleSource`]: random-access dataset ([`InMemorySource`], [`SegmentationFolder`])
//! - [`Predictor`]: the injected prediction function (label map or score tensor)
//! - [`CaseAggregator`]: sequential or rayon-parallel evaluation with identical results
//! - [`WorstCaseSelector`]: O(K) worst-case retention, mergeable across workers

pub mod aggregator;
pub mod error;
pub mod folder;
pub mod predictor;
pub mod sample;
pub mod selector;
pub mod summary;

pub use aggregator::{CaseAggregator, EvaluatedCase, EvaluationOutcome, PartialEvaluation};
pub use error::{EvalError, EvalResult, SampleError, SampleResult};
pub use folder::{decode_mask, is_supported_image, FolderLayout, MaskEncoding, SegmentationFolder};
pub use predictor::{PredictError, Prediction, Predictor};
pub use sample::{InMemorySource, Sample, SampleSource};
pub use selector::{select_worst, Ranked, WorstCaseSelector};
pub use summary::{DatasetSummary, SkippedSample};
