use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while rendering or persisting report artifacts.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A filesystem operation on an artifact failed.
    #[error("I/O error on {path}")]
    Io {
        /// The artifact path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be serialised to JSON.
    #[error("failed to serialise {path}")]
    Serialization {
        /// The artifact path.
        path: PathBuf,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A rendered image could not be encoded.
    #[error("failed to encode image {path}")]
    ImageEncode {
        /// The artifact path.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// The case image and its class maps disagree in size.
    #[error(
        "cannot render {what}: image {image_width}x{image_height}, map {map_width}x{map_height}"
    )]
    DimensionMismatch {
        what: String,
        image_width: u32,
        image_height: u32,
        map_width: u32,
        map_height: u32,
    },

    /// The overlay weight lies outside `[0, 1]`.
    #[error("overlay alpha must lie in [0, 1], got {alpha}")]
    InvalidAlpha { alpha: f64 },

    /// A report violates its ordering or length invariant.
    #[error("invalid failure report: {reason}")]
    InvalidReport {
        /// The violated invariant.
        reason: String,
    },
}

/// A specialized `Result` type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Why a previously produced artifact could not be read.
///
/// Neither variant is fatal: readers treat both as "no data available".
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// The artifact has not been generated.
    #[error("artifact not found: {path}")]
    Missing {
        /// The expected artifact path.
        path: PathBuf,
    },

    /// The artifact exists but cannot be parsed.
    #[error("malformed artifact {path}: {reason}")]
    Malformed {
        /// The artifact path.
        path: PathBuf,
        /// The read or parse failure.
        reason: String,
    },
}
