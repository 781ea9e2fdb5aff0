//! Per-class IoU values with absent classes kept as undefined.
//!
//! A class that appears in neither the prediction nor the ground truth has no IoU. It is
//! stored as `None` and never contributes to a mean.

use crate::{class_map::ClassMap, confusion::ConfusionMatrix, error::MetricResult};

/// IoU per class id, `None` where the class union is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassIou {
    values: Vec<Option<f64>>,
}

impl ClassIou {
    pub fn new(values: Vec<Option<f64>>) -> Self {
        Self { values }
    }

    pub fn num_classes(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, class: usize) -> Option<f64> {
        self.values.get(class).copied().flatten()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// `(class id, IoU)` for every class with a defined value, in id order.
    pub fn defined(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(class, iou)| iou.map(|iou| (class, iou)))
    }

    /// Mean over defined classes; `None` if no class is defined.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .defined()
            .fold((0.0, 0usize), |(sum, count), (_, iou)| (sum + iou, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// The `n` lowest defined IoUs, ascending, ties broken by class id.
    pub fn worst(&self, n: usize) -> Vec<(usize, f64)> {
        let mut defined: Vec<_> = self.defined().collect();
        defined.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        defined.truncate(n);
        defined
    }
}

/// Computes per-class IoU for one prediction/ground-truth pair.
pub fn per_class_iou(
    prediction: &ClassMap,
    ground_truth: &ClassMap,
    num_classes: usize,
) -> MetricResult<ClassIou> {
    ConfusionMatrix::from_maps(ground_truth, prediction, num_classes)
        .map(|matrix| matrix.per_class_iou())
}
