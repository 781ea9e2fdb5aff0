//! Dataset-level results of an evaluation pass.

use std::collections::BTreeMap;

use segdiag_metric::{ClassIou, ClassRegistry, ConfusionMatrix};
use serde::Serialize;

/// A sample that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSample {
    pub index: usize,
    pub sample_id: String,
    pub reason: String,
}

/// Dataset-level IoU pooled over every evaluated pixel.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    /// Samples offered by the source.
    pub total_samples: usize,
    /// Samples that were scored.
    pub evaluated: usize,
    /// Scored samples with a defined mean IoU (eligible for ranking).
    pub ranked: usize,
    /// Number of samples that failed.
    pub skipped_count: usize,
    /// Samples that failed, in dataset order.
    pub skipped: Vec<SkippedSample>,
    /// Mean of the defined pooled per-class IoUs.
    pub mean_iou: Option<f64>,
    /// Σ intersection / Σ union per class, `None` if the class never occurred.
    pub per_class_iou: Vec<Option<f64>>,
    /// Number of samples in which each class had a defined IoU.
    pub observations: Vec<u64>,
    #[serde(skip)]
    pub confusion: ConfusionMatrix,
}

impl DatasetSummary {
    pub(crate) fn new(
        total_samples: usize,
        evaluated: usize,
        ranked: usize,
        mut skipped: Vec<SkippedSample>,
        confusion: ConfusionMatrix,
        observations: Vec<u64>,
    ) -> Self {
        skipped.sort_by_key(|skip| skip.index);
        let class_iou = confusion.per_class_iou();
        Self {
            total_samples,
            evaluated,
            ranked,
            skipped_count: skipped.len(),
            skipped,
            mean_iou: class_iou.mean(),
            per_class_iou: class_iou.values().to_vec(),
            observations,
            confusion,
        }
    }

    pub fn class_iou(&self) -> ClassIou {
        ClassIou::new(self.per_class_iou.clone())
    }

    /// Class name → pooled IoU, as persisted for charting.
    pub fn per_class_named(&self, registry: &ClassRegistry) -> BTreeMap<String, Option<f64>> {
        registry
            .iter()
            .map(|class| {
                let iou = self.per_class_iou.get(class.id).copied().flatten();
                (class.name.clone(), iou)
            })
            .collect()
    }
}
