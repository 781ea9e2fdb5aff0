//! Dense H×W label maps and arg-max reduction of per-class score tensors.

use burn::tensor::{backend::Backend, DType, Tensor};

use crate::error::{MetricError, MetricResult};

/// A row-major H×W map of class ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    height: usize,
    width: usize,
    labels: Vec<u16>,
}

impl ClassMap {
    /// Wraps a row-major label buffer of `height * width` entries.
    pub fn new(height: usize, width: usize, labels: Vec<u16>) -> MetricResult<Self> {
        if labels.len() != height * width {
            return Err(MetricError::ShapeMismatch {
                expected: format!("{} labels ({height}x{width})", height * width),
                actual: format!("{} labels", labels.len()),
            });
        }
        Ok(Self {
            height,
            width,
            labels,
        })
    }

    /// A map where every pixel carries `label`.
    pub fn filled(height: usize, width: usize, label: u16) -> Self {
        Self {
            height,
            width,
            labels: vec![label; height * width],
        }
    }

    /// Reduces a `[classes, height, width]` score tensor to the arg-max label per pixel.
    pub fn from_scores<B: Backend>(scores: Tensor<B, 3>) -> MetricResult<Self> {
        let [classes, height, width] = scores.dims();
        if classes == 0 {
            return Err(MetricError::ShapeMismatch {
                expected: "at least one score channel".to_string(),
                actual: format!("[{classes}, {height}, {width}]"),
            });
        }

        let labels = scores
            .argmax(0)
            .into_data()
            .convert_dtype(DType::I64)
            .to_vec::<i64>()
            .map_err(|e| MetricError::TensorConversion {
                reason: format!("{e:?}"),
            })?;

        let labels = labels
            .into_iter()
            .map(|label| {
                u16::try_from(label).map_err(|_| MetricError::LabelOutOfRange {
                    label: label.max(0) as usize,
                    num_classes: classes,
                })
            })
            .collect::<MetricResult<Vec<_>>>()?;

        Self::new(height, width, labels)
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// `(height, width)`.
    pub const fn dims(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn labels(&self) -> &[u16] {
        &self.labels
    }

    pub fn get(&self, y: usize, x: usize) -> Option<u16> {
        if y >= self.height || x >= self.width {
            return None;
        }
        self.labels.get(y * self.width + x).copied()
    }

    /// Number of pixels carrying `label`.
    pub fn count(&self, label: u16) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn new_rejects_wrong_length() {
        let result = ClassMap::new(2, 3, vec![0; 5]);
        assert!(matches!(result, Err(MetricError::ShapeMismatch { .. })));
    }

    #[test]
    fn get_is_row_major() {
        let map = ClassMap::new(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(map.get(0, 2), Some(2));
        assert_eq!(map.get(1, 0), Some(3));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.get(0, 3), None);
    }

    #[test]
    fn from_scores_takes_argmax_over_class_axis() {
        let device = Default::default();
        // 3 classes over a 1x2 map: pixel 0 → class 2, pixel 1 → class 0.
        let scores = vec![
            0.1f32, 0.9, // class 0
            0.3, 0.05, // class 1
            0.6, 0.05, // class 2
        ];
        let tensor =
            Tensor::<TestBackend, 3>::from_data(TensorData::new(scores, [3, 1, 2]), &device);

        let map = ClassMap::from_scores(tensor).unwrap();
        assert_eq!(map.dims(), (1, 2));
        assert_eq!(map.labels(), &[2, 0]);
    }

    #[test]
    fn count_counts_matching_pixels() {
        let map = ClassMap::new(1, 4, vec![6, 0, 6, 6]).unwrap();
        assert_eq!(map.count(6), 3);
        assert_eq!(map.count(1), 0);
    }
}
