//! The seam between evaluation and the (external) inference subsystem.

use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;
use segdiag_metric::{ClassMap, MetricError, MetricResult};
use thiserror::Error;

use crate::error::SampleError;

/// What a predictor returns for one image.
#[derive(Debug, Clone)]
pub enum Prediction<B: Backend> {
    /// Final H×W label map.
    Labels(ClassMap),
    /// `[classes, H, W]` scores, reduced by arg-max over the class axis.
    Scores(Tensor<B, 3>),
}

impl<B: Backend> Prediction<B> {
    /// Resolves the prediction to a label map for `num_classes` classes.
    pub fn into_class_map(self, num_classes: usize) -> MetricResult<ClassMap> {
        match self {
            Self::Labels(map) => Ok(map),
            Self::Scores(scores) => {
                let [classes, ..] = scores.dims();
                if classes != num_classes {
                    return Err(MetricError::ClassCountMismatch {
                        expected: num_classes,
                        actual: classes,
                    });
                }
                ClassMap::from_scores(scores)
            }
        }
    }
}

/// Failure reported by a predictor for a single image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct PredictError {
    reason: String,
}

impl PredictError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<PredictError> for SampleError {
    fn from(error: PredictError) -> Self {
        Self::Prediction {
            reason: error.reason,
        }
    }
}

/// Maps an image to a class prediction.
///
/// Called concurrently from evaluation workers, hence `Sync`.
pub trait Predictor<B: Backend>: Sync {
    fn predict(
        &self,
        sample_id: &str,
        image: &RgbImage,
        device: &B::Device,
    ) -> Result<Prediction<B>, PredictError>;
}

impl<B, F> Predictor<B> for F
where
    B: Backend,
    F: Fn(&str, &RgbImage, &B::Device) -> Result<Prediction<B>, PredictError> + Sync,
{
    fn predict(
        &self,
        sample_id: &str,
        image: &RgbImage,
        device: &B::Device,
    ) -> Result<Prediction<B>, PredictError> {
        self(sample_id, image, device)
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn scores_with_wrong_class_count_are_rejected() {
        let device = Default::default();
        let scores = Tensor::<TestBackend, 3>::zeros([2, 2, 2], &device);
        let result = Prediction::Scores(scores).into_class_map(3);
        assert!(matches!(
            result,
            Err(MetricError::ClassCountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn scores_reduce_to_labels() {
        let device = Default::default();
        let data = TensorData::new(vec![0.0f32, 1.0, 1.0, 0.0], [2, 1, 2]);
        let scores = Tensor::<TestBackend, 3>::from_data(data, &device);
        let map = Prediction::Scores(scores).into_class_map(2).unwrap();
        assert_eq!(map.labels(), &[1, 0]);
    }

    #[test]
    fn predict_errors_become_sample_errors() {
        let error = PredictError::new("model returned no output");
        assert_eq!(error.to_string(), "model returned no output");
        assert!(matches!(
            SampleError::from(error),
            SampleError::Prediction { reason } if reason == "model returned no output"
        ));
    }

    #[test]
    fn closures_are_predictors() {
        let predictor = |_: &str, image: &RgbImage, _: &<TestBackend as Backend>::Device| {
            let (w, h) = image.dimensions();
            Ok::<_, PredictError>(Prediction::<TestBackend>::Labels(ClassMap::filled(
                h as usize, w as usize, 1,
            )))
        };
        let image = RgbImage::new(2, 3);
        let result =
            Predictor::<TestBackend>::predict(&predictor, "x", &image, &Default::default());
        match result {
            Ok(Prediction::Labels(map)) => assert_eq!(map.dims(), (3, 2)),
            other => panic!("unexpected prediction: {other:?}"),
        }
    }
}
