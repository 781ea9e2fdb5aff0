use thiserror::Error;

/// Errors raised while building class maps, registries or confusion matrices.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    /// Two label maps (or a label buffer and its declared size) disagree in shape.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// The expected shape.
        expected: String,
        /// The actual shape.
        actual: String,
    },

    /// A label map contains a value outside `0..num_classes`.
    #[error("label {label} is out of range for {num_classes} classes")]
    LabelOutOfRange {
        /// The offending label value.
        label: usize,
        /// The number of classes known to the caller.
        num_classes: usize,
    },

    /// Two accumulators built for a different number of classes were combined.
    #[error("class count mismatch: expected {expected}, got {actual}")]
    ClassCountMismatch {
        /// The expected class count.
        expected: usize,
        /// The actual class count.
        actual: usize,
    },

    /// The class table handed to [`ClassRegistry::new`](crate::ClassRegistry::new) is inconsistent.
    #[error("invalid class registry: {reason}")]
    InvalidRegistry {
        /// The reason why the registry is invalid.
        reason: String,
    },

    /// Reading a tensor back to host memory failed.
    #[error("tensor conversion failed: {reason}")]
    TensorConversion {
        /// The reason for the conversion failure.
        reason: String,
    },
}

/// A specialized `Result` type for metric operations.
pub type MetricResult<T> = Result<T, MetricError>;
