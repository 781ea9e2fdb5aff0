//! Pixel confusion matrix between a ground-truth and a predicted class map.

use crate::{
    class_map::ClassMap,
    error::{MetricError, MetricResult},
    iou::ClassIou,
};

/// N×N table where `get(g, p)` counts pixels with ground truth `g` and prediction `p`.
///
/// Matrices from disjoint sets of pixels are combined with [`merge`](Self::merge), which is
/// element-wise addition and therefore independent of the order partials arrive in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    /// An all-zero matrix for `num_classes` classes.
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        }
    }

    /// Builds the matrix for a single prediction/ground-truth pair in one pass.
    pub fn from_maps(
        ground_truth: &ClassMap,
        prediction: &ClassMap,
        num_classes: usize,
    ) -> MetricResult<Self> {
        let mut matrix = Self::new(num_classes);
        matrix.accumulate(ground_truth, prediction)?;
        Ok(matrix)
    }

    /// Adds the pixels of one pair to the matrix.
    ///
    /// The matrix is left untouched when the maps disagree in shape or carry a label
    /// outside `0..num_classes`.
    pub fn accumulate(
        &mut self,
        ground_truth: &ClassMap,
        prediction: &ClassMap,
    ) -> MetricResult<()> {
        if ground_truth.dims() != prediction.dims() {
            let (gh, gw) = ground_truth.dims();
            let (ph, pw) = prediction.dims();
            return Err(MetricError::ShapeMismatch {
                expected: format!("{gh}x{gw}"),
                actual: format!("{ph}x{pw}"),
            });
        }

        let n = self.num_classes;
        let mut local = vec![0u64; n * n];
        for (&g, &p) in ground_truth.labels().iter().zip(prediction.labels()) {
            let (g, p) = (usize::from(g), usize::from(p));
            if g >= n || p >= n {
                return Err(MetricError::LabelOutOfRange {
                    label: g.max(p),
                    num_classes: n,
                });
            }
            local[g * n + p] += 1;
        }

        for (total, count) in self.counts.iter_mut().zip(local) {
            *total += count;
        }
        Ok(())
    }

    /// Adds another matrix of the same size into this one.
    pub fn merge(&mut self, other: &Self) -> MetricResult<()> {
        if other.num_classes != self.num_classes {
            return Err(MetricError::ClassCountMismatch {
                expected: self.num_classes,
                actual: other.num_classes,
            });
        }
        for (total, count) in self.counts.iter_mut().zip(&other.counts) {
            *total += count;
        }
        Ok(())
    }

    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn get(&self, ground_truth: usize, prediction: usize) -> u64 {
        if ground_truth >= self.num_classes || prediction >= self.num_classes {
            return 0;
        }
        self.counts[ground_truth * self.num_classes + prediction]
    }

    /// Pixels whose ground truth is `class`.
    pub fn row_sum(&self, class: usize) -> u64 {
        (0..self.num_classes).map(|p| self.get(class, p)).sum()
    }

    /// Pixels predicted as `class`.
    pub fn col_sum(&self, class: usize) -> u64 {
        (0..self.num_classes).map(|g| self.get(g, class)).sum()
    }

    /// Pixels where prediction equals ground truth.
    pub fn diagonal_sum(&self) -> u64 {
        (0..self.num_classes).map(|c| self.get(c, c)).sum()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn intersection(&self, class: usize) -> u64 {
        self.get(class, class)
    }

    pub fn union(&self, class: usize) -> u64 {
        self.row_sum(class) + self.col_sum(class) - self.intersection(class)
    }

    /// IoU of `class`, or `None` when the class is absent from both maps.
    pub fn class_iou(&self, class: usize) -> Option<f64> {
        match self.union(class) {
            0 => None,
            union => Some(self.intersection(class) as f64 / union as f64),
        }
    }

    pub fn per_class_iou(&self) -> ClassIou {
        ClassIou::new((0..self.num_classes).map(|c| self.class_iou(c)).collect())
    }
}
