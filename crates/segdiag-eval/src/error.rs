//! Error types for dataset evaluation.
//!
//! [`EvalError`] aborts an evaluation run. [`SampleError`] only ever affects one sample:
//! the aggregator records it as a skipped sample and keeps going.

use std::path::PathBuf;

use segdiag_metric::MetricError;
use thiserror::Error;

/// Errors that abort an evaluation run.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The dataset root or one of its required directories does not exist.
    #[error("dataset unavailable: {path} does not exist")]
    DatasetUnavailable {
        /// The missing path.
        path: PathBuf,
    },

    /// Reading a dataset directory failed.
    #[error("failed to read directory: {path}")]
    DirectoryReadFailed {
        /// The directory that could not be listed.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The dataset directories exist but contain no usable image/mask pair.
    #[error("no image/mask pairs found in: {path}")]
    NoSamples {
        /// The image directory that was scanned.
        path: PathBuf,
    },

    /// A configuration value is out of range.
    #[error("invalid evaluation configuration: {reason}")]
    InvalidConfiguration {
        /// The reason why the configuration is invalid.
        reason: String,
    },

    /// Combining partial results failed.
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// A specialized `Result` type for evaluation runs.
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors confined to a single sample.
#[derive(Error, Debug)]
pub enum SampleError {
    /// The prediction function failed.
    #[error("prediction failed: {reason}")]
    Prediction {
        /// The reason reported by the predictor.
        reason: String,
    },

    /// The source has no sample at this index.
    #[error("no sample at index {index}")]
    NotFound {
        /// The requested index.
        index: usize,
    },

    /// An image or mask file could not be decoded.
    #[error("failed to open image: {path}")]
    ImageOpenFailed {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// A mask pixel value has no class in the configured encoding.
    #[error("mask value {value} in {path} does not map to a class")]
    UnknownMaskValue {
        /// The unmapped raw value.
        value: u16,
        /// The mask file.
        path: PathBuf,
    },

    /// The source image and the ground truth disagree in size.
    #[error("image is {image_height}x{image_width} but ground truth is {mask_height}x{mask_width}")]
    DimensionMismatch {
        image_height: usize,
        image_width: usize,
        mask_height: usize,
        mask_width: usize,
    },

    /// Shape mismatch or out-of-range labels while scoring the sample.
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// A specialized `Result` type for per-sample work.
pub type SampleResult<T> = Result<T, SampleError>;
