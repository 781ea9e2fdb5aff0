//! Composite diagnostic images for ranked cases.

use std::sync::Arc;

use image::{imageops, Rgb, RgbImage};
use segdiag_eval::EvaluatedCase;
use segdiag_metric::{ClassMap, ClassRegistry};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// Mask weight used by the overlay mode unless configured otherwise.
pub const DEFAULT_OVERLAY_ALPHA: f64 = 0.4;

/// Panel layout of a rendered case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderMode {
    /// `[image | ground truth | prediction]`.
    #[default]
    SideBySide,
    /// Image blended with the prediction, optionally followed by a ground-truth blend.
    Overlay { include_ground_truth: bool },
}

/// Paints a class map with registry colors. Labels without a registry entry are black.
pub fn colorize(map: &ClassMap, registry: &ClassRegistry) -> RgbImage {
    let (height, width) = map.dims();
    let mut image = RgbImage::new(width as u32, height as u32);
    for (pixel, &label) in image.pixels_mut().zip(map.labels()) {
        *pixel = Rgb(registry.color(label as usize).unwrap_or([0, 0, 0]));
    }
    image
}

/// Per-channel `image·(1 − alpha) + mask·alpha`, rounded and saturated to `u8`.
pub fn blend(image: &RgbImage, mask: &RgbImage, alpha: f64) -> RgbImage {
    let mut out = image.clone();
    for (pixel, overlay) in out.pixels_mut().zip(mask.pixels()) {
        for (channel, &over) in pixel.0.iter_mut().zip(&overlay.0) {
            let value = f64::from(*channel) * (1.0 - alpha) + f64::from(over) * alpha;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Places panels left to right, top-aligned.
pub fn hconcat(panels: &[RgbImage]) -> RgbImage {
    let width = panels.iter().map(RgbImage::width).sum();
    let height = panels.iter().map(RgbImage::height).max().unwrap_or(0);
    let mut canvas = RgbImage::new(width, height);
    let mut x = 0i64;
    for panel in panels {
        imageops::replace(&mut canvas, panel, x, 0);
        x += i64::from(panel.width());
    }
    canvas
}

#[derive(Debug, Clone)]
pub struct Renderer {
    registry: Arc<ClassRegistry>,
    mode: RenderMode,
    alpha: f64,
}

impl Renderer {
    pub fn new(registry: Arc<ClassRegistry>, mode: RenderMode, alpha: f64) -> ReportResult<Self> {
        if !(0.0..=1.0).contains(&alpha) {
            return Err(ReportError::InvalidAlpha { alpha });
        }
        Ok(Self {
            registry,
            mode,
            alpha,
        })
    }

    pub const fn mode(&self) -> RenderMode {
        self.mode
    }

    fn check(&self, case: &EvaluatedCase, what: &str, map: &ClassMap) -> ReportResult<()> {
        let (height, width) = map.dims();
        let (image_width, image_height) = case.image.dimensions();
        if (image_height as usize, image_width as usize) != (height, width) {
            return Err(ReportError::DimensionMismatch {
                what: format!("{what} of {}", case.sample_id),
                image_width,
                image_height,
                map_width: width as u32,
                map_height: height as u32,
            });
        }
        Ok(())
    }

    /// Renders one case. Pure: the same case and mode always give the same pixels.
    pub fn render(&self, case: &EvaluatedCase) -> ReportResult<RgbImage> {
        self.check(case, "ground truth", &case.ground_truth)?;
        self.check(case, "prediction", &case.prediction)?;

        let ground_truth = colorize(&case.ground_truth, &self.registry);
        let prediction = colorize(&case.prediction, &self.registry);

        let panels = match self.mode {
            RenderMode::SideBySide => vec![case.image.clone(), ground_truth, prediction],
            RenderMode::Overlay {
                include_ground_truth: false,
            } => return Ok(blend(&case.image, &prediction, self.alpha)),
            RenderMode::Overlay {
                include_ground_truth: true,
            } => vec![
                blend(&case.image, &prediction, self.alpha),
                blend(&case.image, &ground_truth, self.alpha),
            ],
        };
        Ok(hconcat(&panels))
    }
}
