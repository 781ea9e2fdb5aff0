//! On-disk dataset of colour images paired with segmentation masks.
//!
//! ```text
//! <root>/Color_Images/0001.png
//! <root>/Segmentation/0001.png
//! ```
//!
//! Images and masks are paired by file stem and visited in file-name order.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use image::DynamicImage;
use segdiag_metric::ClassMap;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{
    error::{EvalError, EvalResult, SampleError, SampleResult},
    sample::{Sample, SampleSource},
};

/// File extensions accepted for images and masks.
const VALID_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Sub-directory names below the dataset root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderLayout {
    pub image_dir: String,
    pub mask_dir: String,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            image_dir: "Color_Images".to_string(),
            mask_dir: "Segmentation".to_string(),
        }
    }
}

/// How raw mask pixel values map to class ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskEncoding {
    /// Pixel value is the class id.
    #[default]
    Direct,
    /// `values[id]` is the raw pixel value of class `id`.
    Values { values: Vec<u16> },
}

impl MaskEncoding {
    pub fn decode(&self, raw: u16) -> Option<u16> {
        match self {
            Self::Direct => Some(raw),
            Self::Values { values } => values
                .iter()
                .position(|&value| value == raw)
                .and_then(|id| u16::try_from(id).ok()),
        }
    }
}

/// Reads a mask file and maps every pixel through `encoding`.
///
/// Raw values are read at the file's own bit depth. Colour masks (including palette
/// images, which decode to RGB) use their first channel.
pub fn decode_mask(path: &Path, encoding: &MaskEncoding) -> SampleResult<ClassMap> {
    let mask = image::open(path).map_err(|source| SampleError::ImageOpenFailed {
        path: path.to_path_buf(),
        source,
    })?;
    let (width, height) = (mask.width(), mask.height());
    let raw: Vec<u16> = match mask {
        DynamicImage::ImageLuma8(mask) => mask.into_raw().into_iter().map(u16::from).collect(),
        DynamicImage::ImageLuma16(mask) => mask.into_raw(),
        colour @ (DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)) => colour
            .into_rgb8()
            .pixels()
            .map(|pixel| u16::from(pixel[0]))
            .collect(),
        other => other.into_rgb16().pixels().map(|pixel| pixel[0]).collect(),
    };

    let labels = raw
        .into_iter()
        .map(|raw| {
            encoding
                .decode(raw)
                .ok_or_else(|| SampleError::UnknownMaskValue {
                    value: raw,
                    path: path.to_path_buf(),
                })
        })
        .collect::<SampleResult<Vec<_>>>()?;

    Ok(ClassMap::new(height as usize, width as usize, labels)?)
}

/// Returns true if the path has an image extension we can decode.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            VALID_EXTENSIONS
                .iter()
                .any(|valid| ext.eq_ignore_ascii_case(valid))
        })
}

/// Lists supported image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> EvalResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| EvalError::DirectoryReadFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[derive(Debug, Clone)]
struct FolderItem {
    id: String,
    image: PathBuf,
    mask: PathBuf,
}

/// Image/mask pairs discovered under a dataset root.
#[derive(Debug, Clone)]
pub struct SegmentationFolder {
    items: Vec<FolderItem>,
    encoding: MaskEncoding,
}

impl SegmentationFolder {
    /// Scans `root` for image/mask pairs.
    ///
    /// A missing root or sub-directory, or a dataset without a single pair, is fatal.
    /// Images without a matching mask are logged and left out.
    pub fn open(root: &Path, layout: &FolderLayout, encoding: MaskEncoding) -> EvalResult<Self> {
        let image_root = root.join(&layout.image_dir);
        let mask_root = root.join(&layout.mask_dir);

        for dir in [root, image_root.as_path(), mask_root.as_path()] {
            if !dir.is_dir() {
                return Err(EvalError::DatasetUnavailable {
                    path: dir.to_path_buf(),
                });
            }
        }

        let mut masks = BTreeMap::new();
        for mask in list_images(&mask_root)? {
            if let Some(stem) = mask.file_stem().and_then(|s| s.to_str()) {
                masks.entry(stem.to_string()).or_insert_with(|| mask.clone());
            }
        }

        let mut items = Vec::new();
        for image in list_images(&image_root)? {
            let Some(stem) = image.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!(path = %image.display(), "skipping image with non UTF-8 name");
                continue;
            };

            match masks.get(stem) {
                Some(mask) => items.push(FolderItem {
                    id: stem.to_string(),
                    image: image.clone(),
                    mask: mask.clone(),
                }),
                None => tracing::warn!(path = %image.display(), "no mask found for image"),
            }
        }

        if items.is_empty() {
            return Err(EvalError::NoSamples { path: image_root });
        }

        tracing::info!(
            pairs = items.len(),
            root = %root.display(),
            "found image/mask pairs",
        );
        Ok(Self { items, encoding })
    }
}

impl SampleSource for SegmentationFolder {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn sample_id(&self, index: usize) -> String {
        self.items
            .get(index)
            .map_or_else(|| format!("#{index}"), |item| item.id.clone())
    }

    fn load(&self, index: usize) -> SampleResult<Sample> {
        let item = self.items.get(index).ok_or(SampleError::NotFound { index })?;

        let image = image::open(&item.image)
            .map_err(|source| SampleError::ImageOpenFailed {
                path: item.image.clone(),
                source,
            })?
            .into_rgb8();
        let ground_truth = decode_mask(&item.mask, &self.encoding)?;

        Sample::new(item.id.clone(), image, ground_truth)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::{ImageBuffer, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn write_pair(root: &Path, stem: &str, mask_value: u16) {
        RgbImage::new(3, 2)
            .save(root.join("Color_Images").join(format!("{stem}.png")))
            .unwrap();
        ImageBuffer::<Luma<u16>, _>::from_pixel(3, 2, Luma([mask_value]))
            .save(root.join("Segmentation").join(format!("{stem}.png")))
            .unwrap();
    }

    fn dataset_root() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Color_Images")).unwrap();
        fs::create_dir_all(dir.path().join("Segmentation")).unwrap();
        dir
    }

    #[test]
    fn open_fails_for_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result =
            SegmentationFolder::open(&missing, &FolderLayout::default(), MaskEncoding::Direct);
        assert!(matches!(result, Err(EvalError::DatasetUnavailable { .. })));
    }

    #[test]
    fn open_fails_without_pairs() {
        let dir = dataset_root();
        let result =
            SegmentationFolder::open(dir.path(), &FolderLayout::default(), MaskEncoding::Direct);
        assert!(matches!(result, Err(EvalError::NoSamples { .. })));
    }

    #[test]
    fn pairs_by_stem_in_name_order_and_skips_unmatched() {
        let dir = dataset_root();
        write_pair(dir.path(), "b", 1);
        write_pair(dir.path(), "a", 2);
        RgbImage::new(3, 2)
            .save(dir.path().join("Color_Images").join("orphan.png"))
            .unwrap();
        fs::write(dir.path().join("Color_Images").join("notes.txt"), "x").unwrap();

        let folder =
            SegmentationFolder::open(dir.path(), &FolderLayout::default(), MaskEncoding::Direct)
                .unwrap();

        assert_eq!(folder.len(), 2);
        assert_eq!(folder.sample_id(0), "a");
        assert_eq!(folder.sample_id(1), "b");

        let sample = folder.load(0).unwrap();
        assert_eq!(sample.ground_truth.dims(), (2, 3));
        assert!(sample.ground_truth.labels().iter().all(|&l| l == 2));
    }

    #[test]
    fn value_encoding_maps_raw_values_and_rejects_unknown() {
        let dir = dataset_root();
        write_pair(dir.path(), "known", 700);
        write_pair(dir.path(), "unknown", 42);
        let encoding = MaskEncoding::Values {
            values: vec![100, 200, 700],
        };

        let folder =
            SegmentationFolder::open(dir.path(), &FolderLayout::default(), encoding).unwrap();

        let known = folder.load(0).unwrap();
        assert!(known.ground_truth.labels().iter().all(|&l| l == 2));
        assert!(matches!(
            folder.load(1),
            Err(SampleError::UnknownMaskValue { value: 42, .. })
        ));
    }

    #[test]
    fn eight_bit_masks_keep_raw_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        ImageBuffer::<Luma<u8>, _>::from_pixel(2, 2, Luma([6u8]))
            .save(&path)
            .unwrap();

        let map = decode_mask(&path, &MaskEncoding::Direct).unwrap();
        assert_eq!(map.dims(), (2, 2));
        assert_eq!(map.count(6), 4);
    }

    #[test]
    fn colour_masks_use_the_first_channel() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = dir.path().join("rgb.png");
        let rgba = dir.path().join("rgba.png");
        RgbImage::from_pixel(2, 2, Rgb([6, 6, 6])).save(&rgb).unwrap();
        RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 255]))
            .save(&rgba)
            .unwrap();

        assert_eq!(decode_mask(&rgb, &MaskEncoding::Direct).unwrap().count(6), 4);
        assert_eq!(decode_mask(&rgba, &MaskEncoding::Direct).unwrap().count(9), 4);
    }

    #[test]
    fn bmp_pairs_load() {
        let dir = dataset_root();
        RgbImage::new(3, 2)
            .save(dir.path().join("Color_Images").join("0001.bmp"))
            .unwrap();
        RgbImage::from_pixel(3, 2, Rgb([4, 4, 4]))
            .save(dir.path().join("Segmentation").join("0001.bmp"))
            .unwrap();

        let folder =
            SegmentationFolder::open(dir.path(), &FolderLayout::default(), MaskEncoding::Direct)
                .unwrap();
        let sample = folder.load(0).unwrap();
        assert_eq!(sample.id, "0001");
        assert!(sample.ground_truth.labels().iter().all(|&l| l == 4));
    }

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported_image(Path::new("a.PNG")));
        assert!(is_supported_image(Path::new("dir/b.jpeg")));
        assert!(!is_supported_image(Path::new("c.txt")));
        assert!(!is_supported_image(Path::new("d")));
    }
}
