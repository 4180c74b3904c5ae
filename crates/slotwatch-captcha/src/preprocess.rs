//! Deterministic image transforms applied before OCR.

use crate::error::{CaptchaError, Result};
use crate::strategy::StrategyConfig;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use slotwatch_core::Timestamp;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Longer side of the upscaled image, in pixels.
pub const TARGET_WIDTH: u32 = 400;

const SHARPEN_SIGMA: f32 = 2.0;

/// Share of darkest/brightest pixels clipped by the contrast stretch.
const STRETCH_CLIP: f64 = 0.01;

/// Turns a raw CAPTCHA screenshot into a binarized, upscaled PNG.
///
/// Pipeline: grayscale, rescale, sharpen, contrast stretch, binarize at the
/// strategy threshold, optional inversion.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    target_width: u32,
    debug_dir: Option<PathBuf>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    /// Preprocessor with the default target size and no debug output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target_width: TARGET_WIDTH,
            debug_dir: None,
        }
    }

    /// Also write every preprocessed image into `dir`.
    #[must_use]
    pub fn with_debug_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_dir = Some(dir.into());
        self
    }

    /// Run the pipeline and return the result as PNG bytes.
    ///
    /// Fails only when `raw` is not a decodable image.
    pub fn preprocess(&self, raw: &[u8], strategy: &StrategyConfig) -> Result<Vec<u8>> {
        let binary = self.transform(raw, strategy)?;

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(binary).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        if let Some(dir) = &self.debug_dir {
            let path = dir.join(format!(
                "preprocessed-{}-{}.png",
                strategy.label,
                Timestamp::now().file_stamp()
            ));
            match std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, &png)) {
                Ok(()) => debug!("Preprocessed image saved: {}", path.display()),
                Err(e) => warn!("Could not write debug image {}: {}", path.display(), e),
            }
        }

        Ok(png)
    }

    /// Run the pipeline and return the binarized image.
    pub fn transform(&self, raw: &[u8], strategy: &StrategyConfig) -> Result<GrayImage> {
        let decoded = image::load_from_memory(raw)
            .map_err(|e| CaptchaError::Preprocess(format!("cannot decode CAPTCHA image: {e}")))?;

        let gray = decoded.to_luma8();
        let scaled = self.rescale(&gray);
        let sharpened = imageops::unsharpen(&scaled, SHARPEN_SIGMA, 0);
        let mut stretched = stretch_contrast(sharpened);
        binarize(&mut stretched, strategy.threshold, strategy.invert);
        Ok(stretched)
    }

    fn rescale(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        let longer = width.max(height);
        if longer == 0 || longer == self.target_width {
            return gray.clone();
        }
        let scale = f64::from(self.target_width) / f64::from(longer);
        let new_width = scaled_dimension(width, scale);
        let new_height = scaled_dimension(height, scale);
        imageops::resize(gray, new_width, new_height, FilterType::CatmullRom)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_dimension(side: u32, scale: f64) -> u32 {
    ((f64::from(side) * scale).round() as u32).max(1)
}

/// Linearly map the 1st..99th percentile of luminance onto 0..255.
fn stretch_contrast(mut image: GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for Luma([value]) in image.pixels() {
        histogram[usize::from(*value)] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return image;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let clip = (total as f64 * STRETCH_CLIP) as u64;

    let low = percentile_from_start(&histogram, clip);
    let high = percentile_from_end(&histogram, clip);
    if high <= low {
        return image;
    }

    let range = f32::from(high - low);
    for Luma([value]) in image.pixels_mut() {
        let clamped = (*value).clamp(low, high);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let stretched = (f32::from(clamped - low) * 255.0 / range).round() as u8;
        *value = stretched;
    }
    image
}

fn percentile_from_start(histogram: &[u64; 256], clip: u64) -> u8 {
    let mut seen = 0;
    for (level, count) in (0u8..=255).zip(histogram.iter()) {
        seen += count;
        if seen > clip {
            return level;
        }
    }
    255
}

fn percentile_from_end(histogram: &[u64; 256], clip: u64) -> u8 {
    let mut seen = 0;
    for (level, count) in (0u8..=255).zip(histogram.iter()).rev() {
        seen += count;
        if seen > clip {
            return level;
        }
    }
    0
}

/// Pixels at or above `threshold` become white, the rest black.
fn binarize(image: &mut GrayImage, threshold: u8, invert: bool) {
    let (on, off) = if invert { (0, 255) } else { (255, 0) };
    for Luma([value]) in image.pixels_mut() {
        *value = if *value >= threshold { on } else { off };
    }
}
