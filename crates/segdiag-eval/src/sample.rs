//! Samples and the sources that hand them to the aggregator.

use image::RgbImage;
use segdiag_metric::ClassMap;

use crate::error::{SampleError, SampleResult};

/// One (image, ground truth) pair.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Stable identity used in logs, skip lists and reports.
    pub id: String,
    /// Source image.
    pub image: RgbImage,
    /// Ground-truth class map with the same size as `image`.
    pub ground_truth: ClassMap,
}

impl Sample {
    /// Pairs an image with its ground truth, checking that their sizes agree.
    pub fn new(
        id: impl Into<String>,
        image: RgbImage,
        ground_truth: ClassMap,
    ) -> SampleResult<Self> {
        let (image_width, image_height) = image.dimensions();
        let (image_height, image_width) = (image_height as usize, image_width as usize);
        let (mask_height, mask_width) = ground_truth.dims();
        if (image_height, image_width) != (mask_height, mask_width) {
            return Err(SampleError::DimensionMismatch {
                image_height,
                image_width,
                mask_height,
                mask_width,
            });
        }
        Ok(Self {
            id: id.into(),
            image,
            ground_truth,
        })
    }
}

/// A finite, ordered, random-access dataset.
///
/// `load` may be called from several worker threads at once.
pub trait SampleSource: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the sample at `index`, available even if loading it fails.
    fn sample_id(&self, index: usize) -> String;

    fn load(&self, index: usize) -> SampleResult<Sample>;
}

/// Samples already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    samples: Vec<Sample>,
}

impl InMemorySource {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl SampleSource for InMemorySource {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn sample_id(&self, index: usize) -> String {
        self.samples
            .get(index)
            .map_or_else(|| format!("#{index}"), |sample| sample.id.clone())
    }

    fn load(&self, index: usize) -> SampleResult<Sample> {
        self.samples
            .get(index)
            .cloned()
            .ok_or(SampleError::NotFound { index })
    }
}

impl FromIterator<Sample> for InMemorySource {
    fn from_iter<T: IntoIterator<Item = Sample>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
