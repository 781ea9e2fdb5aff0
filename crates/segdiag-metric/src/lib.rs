//! # segdiag metrics
//!
//! Per-class Intersection-over-Union for fixed-cardinality pixel classification.
//!
//! - [`ClassRegistry`]: immutable id → (name, colour) table
//! - [`ClassMap`]: H×W label maps, optionally reduced from a burn score tensor
//! - [`ConfusionMatrix`]: single-pass N×N pixel counts, mergeable across workers
//! - [`ClassIou`]: per-class IoU where absent classes stay undefined
//!
//! ```rust
//! use segdiag_metric::{per_class_iou, ClassMap};
//!
//! let gt = ClassMap::filled(4, 4, 0);
//! let pred = ClassMap::filled(4, 4, 0);
//! let iou = per_class_iou(&pred, &gt, 3).unwrap();
//! assert_eq!(iou.mean(), Some(1.0));
//! ```

pub mod class_map;
pub mod confusion;
pub mod error;
pub mod iou;
pub mod registry;

pub use class_map::ClassMap;
pub use confusion::ConfusionMatrix;
pub use error::{MetricError, MetricResult};
pub use iou::{per_class_iou, ClassIou};
pub use registry::{ClassInfo, ClassRegistry};
