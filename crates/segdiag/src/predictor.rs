//! Predictor backed by prediction masks already on disk.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use burn::tensor::backend::Backend;
use image::RgbImage;
use segdiag_eval::{
    decode_mask, folder::list_images, EvalError, EvalResult, MaskEncoding, PredictError,
    Prediction, Predictor,
};

/// Reads the prediction for a sample from `<dir>/<sample_id>.<ext>`.
///
/// Stands in for a live model when predictions were produced by a separate inference run.
#[derive(Debug, Clone)]
pub struct MaskFolderPredictor {
    masks: BTreeMap<String, PathBuf>,
    encoding: MaskEncoding,
}

impl MaskFolderPredictor {
    pub fn open(dir: &Path, encoding: MaskEncoding) -> EvalResult<Self> {
        if !dir.is_dir() {
            return Err(EvalError::DatasetUnavailable {
                path: dir.to_path_buf(),
            });
        }

        let mut masks = BTreeMap::new();
        for path in list_images(dir)? {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                masks.entry(stem.to_string()).or_insert(path);
            }
        }
        tracing::info!(dir = %dir.display(), masks = masks.len(), "indexed prediction masks");
        Ok(Self { masks, encoding })
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

impl<B: Backend> Predictor<B> for MaskFolderPredictor {
    fn predict(
        &self,
        sample_id: &str,
        _image: &RgbImage,
        _device: &B::Device,
    ) -> Result<Prediction<B>, PredictError> {
        let path = self
            .masks
            .get(sample_id)
            .ok_or_else(|| PredictError::new(format!("no prediction mask for {sample_id}")))?;
        let labels =
            decode_mask(path, &self.encoding).map_err(|e| PredictError::new(e.to_string()))?;
        Ok(Prediction::Labels(labels))
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use image::{ImageBuffer, Luma};

    use super::*;

    #[test]
    fn predicts_from_matching_stem() {
        let dir = tempfile::tempdir().unwrap();
        ImageBuffer::<Luma<u8>, _>::from_pixel(2, 3, Luma([4u8]))
            .save(dir.path().join("0001.png"))
            .unwrap();
        let predictor = MaskFolderPredictor::open(dir.path(), MaskEncoding::Direct).unwrap();
        assert_eq!(predictor.len(), 1);

        let image = RgbImage::new(2, 3);
        let prediction =
            Predictor::<NdArray>::predict(&predictor, "0001", &image, &Default::default()).unwrap();
        let Prediction::Labels(map) = prediction else {
            panic!("expected a label map");
        };
        assert_eq!(map.dims(), (3, 2));
        assert_eq!(map.count(4), 6);

        let missing =
            Predictor::<NdArray>::predict(&predictor, "0002", &image, &Default::default());
        assert!(missing.is_err());
    }

    #[test]
    fn missing_directory_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = MaskFolderPredictor::open(&dir.path().join("none"), MaskEncoding::Direct);
        assert!(matches!(result, Err(EvalError::DatasetUnavailable { .. })));
    }
}
